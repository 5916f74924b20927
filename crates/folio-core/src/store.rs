//! The `KeyValueStore` trait and the two backends that need no database.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! [`crate::Repository`] depends on this abstraction, not on any concrete
//! backend. Values are opaque JSON text; the store never inspects them.

use std::{collections::HashMap, convert::Infallible, future::Future, sync::RwLock};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Well-known keys of the persisted state layout.
pub mod keys {
  pub const COMPANY_PROFILE: &str = "companyProfile";
  pub const CUSTOMERS: &str = "customers";
  pub const ITEM_CATALOG: &str = "itemCatalog";
  pub const ITEM_CATEGORIES: &str = "itemCategories";
  pub const QUOTATIONS: &str = "quotations";
  pub const INVOICES: &str = "invoices";
  pub const INVOICE_COUNTER: &str = "invoiceCounter";
  pub const DOCUMENT_TEMPLATES: &str = "documentTemplates";
  pub const ACTIVE_TEMPLATE: &str = "activeTemplate";
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A flat mapping from string keys to JSON text.
///
/// There is no locking and no compare-and-swap: read-modify-write sequences
/// built on top of this trait assume a single writer.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the raw value stored under `key`, or `None` if unset.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Overwrite the value stored under `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── MemoryStore ─────────────────────────────────────────────────────────────

/// A process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.remove(key);
    Ok(())
  }
}

// ─── DetachedStore ───────────────────────────────────────────────────────────

/// A store with no backing environment at all.
///
/// Every read comes back empty and every write is silently dropped, so a
/// repository over it behaves like a fresh, read-only installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedStore;

impl KeyValueStore for DetachedStore {
  type Error = Infallible;

  async fn get(&self, _key: &str) -> Result<Option<String>, Infallible> { Ok(None) }

  async fn set(&self, _key: &str, _value: String) -> Result<(), Infallible> { Ok(()) }

  async fn remove(&self, _key: &str) -> Result<(), Infallible> { Ok(()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get("a").await.unwrap(), None);

    store.set("a", "1".into()).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

    store.set("a", "2".into()).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

    store.remove("a").await.unwrap();
    store.remove("a").await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), None);
  }

  #[tokio::test]
  async fn detached_store_drops_writes() {
    let store = DetachedStore;
    store.set(keys::QUOTATIONS, "[]".into()).await.unwrap();
    assert_eq!(store.get(keys::QUOTATIONS).await.unwrap(), None);
  }
}
