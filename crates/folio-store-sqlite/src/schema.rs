//! SQL schema for the Folio SQLite store.
//!
//! Executed at connection startup. The version is recorded in
//! `PRAGMA user_version` so later layouts can be migrated from it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per top-level key. Values are opaque JSON text.
CREATE TABLE IF NOT EXISTS entries (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL     -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
