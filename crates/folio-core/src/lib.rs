//! Core types and trait definitions for Folio, a local quotation and invoice
//! book.
//!
//! This crate is deliberately free of database, PDF and CLI dependencies.
//! Persistence goes through the [`store::KeyValueStore`] trait; rendering
//! lives in `folio-render`.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod document;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod profile;
pub mod report;
pub mod repository;
pub mod store;
pub mod template;

pub use error::{Error, Result};
pub use repository::Repository;
