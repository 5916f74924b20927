//! Typed accessors over a [`KeyValueStore`].
//!
//! Each record family lives under one key as a JSON array. Every family gets
//! the same four operations through the [`Record`] trait: list, lookup by
//! id, upsert and delete. Cross-record references are plain ids resolved at
//! read time; a dangling id is a `None`, never an error.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
  catalog::{self, CatalogItem, ItemCategory},
  document::{Document, Invoice, InvoiceStatus, Quotation, QuotationStatus},
  profile::{CompanyProfile, Customer},
  report::{self, MonthlyReport, YearSummary},
  store::{keys, KeyValueStore},
  template::{self, DocumentTemplate},
  Error, Result,
};

// ─── Record ──────────────────────────────────────────────────────────────────

/// A record family persisted as a JSON array under [`Record::KEY`].
pub trait Record: Serialize + DeserializeOwned + Clone {
  const KEY: &'static str;

  fn id(&self) -> &str;
  fn created_at(&self) -> DateTime<Utc>;
  fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

  /// Reject the record before anything is written.
  fn validate(&self) -> Result<()>;
}

macro_rules! record {
  ($ty:ty, $key:expr) => {
    impl Record for $ty {
      const KEY: &'static str = $key;

      fn id(&self) -> &str { &self.id }

      fn created_at(&self) -> DateTime<Utc> { self.created_at }

      fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
      }

      fn validate(&self) -> Result<()> { <$ty>::validate(self) }
    }
  };
}

record!(Customer, keys::CUSTOMERS);
record!(CatalogItem, keys::ITEM_CATALOG);
record!(ItemCategory, keys::ITEM_CATEGORIES);
record!(Quotation, keys::QUOTATIONS);
record!(Invoice, keys::INVOICES);
record!(DocumentTemplate, keys::DOCUMENT_TEMPLATES);

// ─── Repository ──────────────────────────────────────────────────────────────

/// The domain repository. Cheap to construct; holds only the store.
#[derive(Debug, Clone)]
pub struct Repository<S> {
  store: S,
}

impl<S: KeyValueStore> Repository<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ── Raw JSON access ──────────────────────────────────────────────────────

  pub(crate) async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let raw = self.store.get(key).await.map_err(Error::store)?;
    Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
  }

  pub(crate) async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    self.store.set(key, json).await.map_err(Error::store)
  }

  // ── Generic CRUD ─────────────────────────────────────────────────────────

  /// Every stored record of the family, in insertion order.
  pub async fn all<T: Record>(&self) -> Result<Vec<T>> {
    Ok(self.read(T::KEY).await?.unwrap_or_default())
  }

  pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
    Ok(self.all::<T>().await?.into_iter().find(|r| r.id() == id))
  }

  /// Insert or replace by id and return the record as stored.
  ///
  /// A new record gets `created_at = updated_at = now`. A replacement keeps
  /// the stored `created_at` and refreshes `updated_at`.
  pub async fn save<T: Record>(&self, mut record: T) -> Result<T> {
    record.validate()?;

    let mut records = self.all::<T>().await?;
    let now = Utc::now();
    match records.iter().position(|r| r.id() == record.id()) {
      Some(i) => {
        record.set_timestamps(records[i].created_at(), now);
        records[i] = record.clone();
        tracing::debug!(key = T::KEY, id = record.id(), "replaced record");
      }
      None => {
        record.set_timestamps(now, now);
        records.push(record.clone());
        tracing::debug!(key = T::KEY, id = record.id(), "inserted record");
      }
    }

    self.write(T::KEY, &records).await?;
    Ok(record)
  }

  /// Remove the record with `id`. Absent ids are a no-op.
  pub async fn delete<T: Record>(&self, id: &str) -> Result<()> {
    let mut records = self.all::<T>().await?;
    let before = records.len();
    records.retain(|r| r.id() != id);
    if records.len() == before {
      return Ok(());
    }
    tracing::debug!(key = T::KEY, id, "deleted record");
    self.write(T::KEY, &records).await
  }

  // ── Company profile ──────────────────────────────────────────────────────

  pub async fn company_profile(&self) -> Result<Option<CompanyProfile>> {
    self.read(keys::COMPANY_PROFILE).await
  }

  /// Overwrite the singleton profile. `created_at` is kept from the stored
  /// profile if there is one.
  pub async fn save_company_profile(&self, mut profile: CompanyProfile) -> Result<CompanyProfile> {
    profile.validate()?;
    let now = Utc::now();
    profile.created_at = match self.company_profile().await? {
      Some(existing) => existing.created_at,
      None => now,
    };
    profile.updated_at = now;
    self.write(keys::COMPANY_PROFILE, &profile).await?;
    Ok(profile)
  }

  // ── Customers ────────────────────────────────────────────────────────────

  pub async fn customers(&self) -> Result<Vec<Customer>> { self.all().await }

  pub async fn customer(&self, id: &str) -> Result<Option<Customer>> { self.get(id).await }

  // ── Catalog ──────────────────────────────────────────────────────────────

  pub async fn catalog_items(&self) -> Result<Vec<CatalogItem>> { self.all().await }

  pub async fn categories(&self) -> Result<Vec<ItemCategory>> { self.all().await }

  /// Active items whose name, description, SKU or category id contains
  /// `query`, ignoring case.
  pub async fn search_catalog_items(&self, query: &str) -> Result<Vec<CatalogItem>> {
    let needle = query.to_lowercase();
    Ok(
      self
        .catalog_items()
        .await?
        .into_iter()
        .filter(|item| item.is_active && item.matches(&needle))
        .collect(),
    )
  }

  pub async fn catalog_items_by_category(&self, category_id: &str) -> Result<Vec<CatalogItem>> {
    Ok(
      self
        .catalog_items()
        .await?
        .into_iter()
        .filter(|item| item.is_active && item.category.as_deref() == Some(category_id))
        .collect(),
    )
  }

  /// Resolve an item's category. A missing or dangling reference is `None`.
  pub async fn category_for(&self, item: &CatalogItem) -> Result<Option<ItemCategory>> {
    match &item.category {
      Some(id) => self.get(id).await,
      None => Ok(None),
    }
  }

  /// Flip an item's active flag. `None` if the item does not exist.
  pub async fn toggle_catalog_item(&self, id: &str) -> Result<Option<CatalogItem>> {
    let Some(mut item) = self.get::<CatalogItem>(id).await? else {
      return Ok(None);
    };
    item.is_active = !item.is_active;
    self.save(item).await.map(Some)
  }

  /// Fill an empty catalog with the default categories and items.
  /// Families that already have records are left alone.
  pub async fn seed_catalog_defaults(&self) -> Result<()> {
    if self.categories().await?.is_empty() {
      for category in catalog::default_categories() {
        self.save(category).await?;
      }
    }
    if self.catalog_items().await?.is_empty() {
      for item in catalog::default_items() {
        self.save(item).await?;
      }
    }
    Ok(())
  }

  // ── Documents ────────────────────────────────────────────────────────────

  pub async fn quotations(&self) -> Result<Vec<Quotation>> { self.all().await }

  pub async fn quotation(&self, id: &str) -> Result<Option<Quotation>> { self.get(id).await }

  pub async fn invoices(&self) -> Result<Vec<Invoice>> { self.all().await }

  pub async fn invoice(&self, id: &str) -> Result<Option<Invoice>> { self.get(id).await }

  /// The quotation an invoice was converted from, if it still exists.
  pub async fn source_quotation(&self, invoice: &Invoice) -> Result<Option<Quotation>> {
    match &invoice.quotation_id {
      Some(id) => self.quotation(id).await,
      None => Ok(None),
    }
  }

  pub async fn set_quotation_status(
    &self,
    id: &str,
    status: QuotationStatus,
  ) -> Result<Option<Quotation>> {
    let Some(mut quotation) = self.quotation(id).await? else {
      return Ok(None);
    };
    quotation.status = status;
    self.save(quotation).await.map(Some)
  }

  pub async fn set_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<Option<Invoice>> {
    let Some(mut invoice) = self.invoice(id).await? else {
      return Ok(None);
    };
    invoice.status = status;
    self.save(invoice).await.map(Some)
  }

  /// Quotations and invoices together, newest `created_at` first.
  pub async fn all_documents(&self) -> Result<Vec<Document>> {
    let mut docs: Vec<Document> = self
      .quotations()
      .await?
      .into_iter()
      .map(Document::from)
      .chain(self.invoices().await?.into_iter().map(Document::from))
      .collect();
    docs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(docs)
  }

  pub async fn document(&self, id: &str) -> Result<Option<Document>> {
    if let Some(q) = self.quotation(id).await? {
      return Ok(Some(q.into()));
    }
    Ok(self.invoice(id).await?.map(Document::from))
  }

  // ── Reports ──────────────────────────────────────────────────────────────

  /// Invoices dated in `year`, grouped by month, January first.
  pub async fn monthly_reports(&self, year: i32) -> Result<Vec<MonthlyReport>> {
    Ok(report::monthly_reports(&self.invoices().await?, year))
  }

  pub async fn year_summary(&self, year: i32) -> Result<YearSummary> {
    Ok(report::year_summary(&self.invoices().await?, year))
  }

  // ── Templates ────────────────────────────────────────────────────────────

  /// Built-in presets followed by custom templates.
  pub async fn templates(&self) -> Result<Vec<DocumentTemplate>> {
    let mut templates = template::presets();
    templates.extend(self.all::<DocumentTemplate>().await?);
    Ok(templates)
  }

  pub async fn template(&self, id: &str) -> Result<Option<DocumentTemplate>> {
    if let Some(preset) = template::presets().into_iter().find(|t| t.id == id) {
      return Ok(Some(preset));
    }
    self.get(id).await
  }

  /// Create a custom template seeded from `base_id`'s settings.
  /// `None` if the base template does not exist.
  pub async fn create_custom_template(
    &self,
    name: &str,
    description: &str,
    base_id: &str,
  ) -> Result<Option<DocumentTemplate>> {
    let Some(base) = self.template(base_id).await? else {
      return Ok(None);
    };
    let custom = DocumentTemplate::clone_from_base(name, description, &base);
    self.save(custom).await.map(Some)
  }

  /// Save an edited custom template. When it is the active template, the
  /// stored active copy is replaced as well.
  pub async fn save_template(&self, template: DocumentTemplate) -> Result<DocumentTemplate> {
    let saved = self.save(template).await?;
    let active: Option<DocumentTemplate> = self.read(keys::ACTIVE_TEMPLATE).await?;
    if active.is_some_and(|t| t.id == saved.id) {
      self.write(keys::ACTIVE_TEMPLATE, &saved).await?;
    }
    Ok(saved)
  }

  /// Delete a custom template. Presets are refused. If the deleted template
  /// was active, the active pointer is cleared.
  pub async fn delete_template(&self, id: &str) -> Result<()> {
    if template::is_preset_id(id) {
      return Err(Error::DefaultTemplateImmutable(id.to_owned()));
    }
    self.delete::<DocumentTemplate>(id).await?;

    let active: Option<DocumentTemplate> = self.read(keys::ACTIVE_TEMPLATE).await?;
    if active.is_some_and(|t| t.id == id) {
      self.clear_active_template().await?;
    }
    Ok(())
  }

  /// The template used for rendering: the stored active template, or the
  /// first preset when none has been chosen.
  pub async fn active_template(&self) -> Result<DocumentTemplate> {
    Ok(
      self
        .read(keys::ACTIVE_TEMPLATE)
        .await?
        .unwrap_or_else(template::fallback_template),
    )
  }

  /// Make `id` the active template. `None` if no such template exists.
  pub async fn set_active_template(&self, id: &str) -> Result<Option<DocumentTemplate>> {
    let Some(template) = self.template(id).await? else {
      return Ok(None);
    };
    self.write(keys::ACTIVE_TEMPLATE, &template).await?;
    tracing::info!(template = %template.id, "active template changed");
    Ok(Some(template))
  }

  pub async fn clear_active_template(&self) -> Result<()> {
    self
      .store
      .remove(keys::ACTIVE_TEMPLATE)
      .await
      .map_err(Error::store)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rust_decimal_macros::dec;

  use super::*;
  use crate::{
    document::{Amounts, QuotationItem},
    store::{DetachedStore, MemoryStore},
  };

  fn repo() -> Repository<MemoryStore> { Repository::new(MemoryStore::new()) }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn quotation(name: &str) -> Quotation {
    Quotation::new(
      name,
      "contact@example.com",
      date(2024, 3, 5),
      Amounts::new(vec![QuotationItem::new("Design", dec!(2), dec!(50))], Some(dec!(10))),
    )
  }

  // ── Round trip / upsert ──────────────────────────────────────────────────

  #[tokio::test]
  async fn save_then_get_round_trips() {
    let r = repo();
    let before = Utc::now();
    let saved = r.save(quotation("Acme")).await.unwrap();

    let fetched = r.quotation(&saved.id).await.unwrap().unwrap();
    assert_eq!(fetched, saved);
    assert!(fetched.updated_at >= before);
  }

  #[tokio::test]
  async fn save_twice_is_an_upsert() {
    let r = repo();
    let saved = r.save(quotation("Acme")).await.unwrap();
    let again = r.save(saved.clone()).await.unwrap();

    assert_eq!(r.quotations().await.unwrap().len(), 1);
    assert_eq!(again.created_at, saved.created_at);
    assert!(again.updated_at >= saved.updated_at);
  }

  #[tokio::test]
  async fn save_keeps_insertion_order() {
    let r = repo();
    let a = r.save(quotation("A")).await.unwrap();
    let b = r.save(quotation("B")).await.unwrap();
    r.save(a.clone()).await.unwrap();

    let ids: Vec<_> = r.quotations().await.unwrap().into_iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
  }

  #[tokio::test]
  async fn invalid_record_is_not_written() {
    let r = repo();
    let mut bad = quotation("Acme");
    bad.customer_name.clear();
    assert!(matches!(r.save(bad).await, Err(Error::Validation(_))));
    assert!(r.quotations().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn deleting_missing_id_is_a_noop() {
    let r = repo();
    let saved = r.save(quotation("Acme")).await.unwrap();
    r.delete::<Quotation>("nope").await.unwrap();
    r.delete::<Invoice>("nope").await.unwrap();
    r.delete::<Customer>("nope").await.unwrap();
    assert_eq!(r.quotations().await.unwrap().len(), 1);

    r.delete::<Quotation>(&saved.id).await.unwrap();
    assert!(r.quotations().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn corrupt_json_surfaces_as_serialization_error() {
    let r = repo();
    r.store().set(keys::QUOTATIONS, "{not json".into()).await.unwrap();
    assert!(matches!(r.quotations().await, Err(Error::Serialization(_))));
  }

  #[tokio::test]
  async fn detached_store_reads_empty_and_ignores_writes() {
    let r = Repository::new(DetachedStore);
    r.save(quotation("Acme")).await.unwrap();
    assert!(r.quotations().await.unwrap().is_empty());
    assert!(r.company_profile().await.unwrap().is_none());
    assert_eq!(r.active_template().await.unwrap().id, template::MODERN_STANDARD);
  }

  // ── Profile / customers ──────────────────────────────────────────────────

  #[tokio::test]
  async fn company_profile_keeps_created_at() {
    let r = repo();
    assert!(r.company_profile().await.unwrap().is_none());

    let first = r.save_company_profile(CompanyProfile::new("Acme")).await.unwrap();
    let mut edited = first.clone();
    edited.company_phone = "555-0100".into();
    edited.created_at = Utc::now() + chrono::Duration::days(1);
    let second = r.save_company_profile(edited).await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(r.company_profile().await.unwrap().unwrap().company_phone, "555-0100");
  }

  #[tokio::test]
  async fn company_profile_requires_name() {
    let r = repo();
    assert!(r.save_company_profile(CompanyProfile::new(" ")).await.is_err());
    assert!(r.company_profile().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn deleting_customer_leaves_documents_alone() {
    let r = repo();
    let customer = r.save(Customer::new("Jane", "jane@example.com")).await.unwrap();
    let q = Quotation::for_customer(
      &customer,
      date(2024, 1, 2),
      Amounts::new(vec![QuotationItem::new("x", dec!(1), dec!(1))], None),
    );
    let q = r.save(q).await.unwrap();

    r.delete::<Customer>(&customer.id).await.unwrap();
    assert!(r.customer(&customer.id).await.unwrap().is_none());
    let kept = r.quotation(&q.id).await.unwrap().unwrap();
    assert_eq!(kept.customer_name, "Jane");
  }

  // ── Catalog ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn search_is_case_insensitive_and_active_only() {
    let r = repo();
    let mut a = CatalogItem::new("Logo Design", dec!(300));
    a.sku = Some("DES-LOGO".into());
    let mut b = CatalogItem::new("Design Review", dec!(80));
    b.is_active = false;
    let c = CatalogItem::new("Hosting", dec!(25));
    r.save(a.clone()).await.unwrap();
    r.save(b).await.unwrap();
    r.save(c).await.unwrap();

    let hits = r.search_catalog_items("DESIGN").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, a.id);

    assert_eq!(r.search_catalog_items("des-logo").await.unwrap().len(), 1);
    assert_eq!(r.search_catalog_items("").await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn dangling_category_resolves_to_none() {
    let r = repo();
    let cat = r.save(ItemCategory::new("Tools")).await.unwrap();
    let mut item = CatalogItem::new("Hammer", dec!(12));
    item.category = Some(cat.id.clone());
    let item = r.save(item).await.unwrap();

    assert_eq!(r.category_for(&item).await.unwrap().unwrap().name, "Tools");
    assert_eq!(r.catalog_items_by_category(&cat.id).await.unwrap().len(), 1);

    r.delete::<ItemCategory>(&cat.id).await.unwrap();
    assert!(r.category_for(&item).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn toggle_flips_active_flag() {
    let r = repo();
    let item = r.save(CatalogItem::new("Hammer", dec!(12))).await.unwrap();
    let toggled = r.toggle_catalog_item(&item.id).await.unwrap().unwrap();
    assert!(!toggled.is_active);
    assert!(r.toggle_catalog_item("missing").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn seeding_is_idempotent() {
    let r = repo();
    r.seed_catalog_defaults().await.unwrap();
    r.seed_catalog_defaults().await.unwrap();
    assert_eq!(r.categories().await.unwrap().len(), 4);
    assert_eq!(r.catalog_items().await.unwrap().len(), 5);
  }

  // ── Documents ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn all_documents_newest_first() {
    let r = repo();
    let q = r.save(quotation("Old")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let inv = Invoice::new(
      "INV-001",
      "New",
      "x",
      date(2024, 3, 6),
      Amounts::new(vec![QuotationItem::new("x", dec!(1), dec!(1))], None),
    );
    let inv = r.save(inv).await.unwrap();

    let docs = r.all_documents().await.unwrap();
    assert_eq!(docs.len(), 2);
    assert!(docs[0].created_at() >= docs[1].created_at());
    assert_eq!(docs[0].id(), inv.id);
    assert_eq!(docs[1].id(), q.id);

    assert!(matches!(r.document(&q.id).await.unwrap(), Some(Document::Quotation(_))));
    assert!(r.document("missing").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn status_updates() {
    let r = repo();
    let q = r.save(quotation("Acme")).await.unwrap();
    let q = r
      .set_quotation_status(&q.id, QuotationStatus::Accepted)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(q.status, QuotationStatus::Accepted);
    assert!(r.set_invoice_status("missing", InvoiceStatus::Paid).await.unwrap().is_none());
  }

  // ── Templates ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn active_template_falls_back_to_first_preset() {
    let r = repo();
    let active = r.active_template().await.unwrap();
    assert_eq!(active, template::presets()[0]);
  }

  #[tokio::test]
  async fn select_and_clear_active_template() {
    let r = repo();
    r.set_active_template(template::MINIMAL_CLEAN).await.unwrap().unwrap();
    assert_eq!(r.active_template().await.unwrap().id, template::MINIMAL_CLEAN);

    assert!(r.set_active_template("missing").await.unwrap().is_none());
    assert_eq!(r.active_template().await.unwrap().id, template::MINIMAL_CLEAN);

    r.clear_active_template().await.unwrap();
    assert_eq!(r.active_template().await.unwrap().id, template::MODERN_STANDARD);
  }

  #[tokio::test]
  async fn presets_cannot_be_deleted_or_saved() {
    let r = repo();
    assert!(matches!(
      r.delete_template(template::CLASSIC_PROFESSIONAL).await,
      Err(Error::DefaultTemplateImmutable(_))
    ));
    let preset = template::presets().remove(0);
    assert!(matches!(r.save(preset).await, Err(Error::DefaultTemplateImmutable(_))));
    assert_eq!(r.templates().await.unwrap().len(), 4);
  }

  #[tokio::test]
  async fn custom_template_lifecycle() {
    let r = repo();
    let custom = r
      .create_custom_template("Mine", "", template::CREATIVE_MODERN)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(r.templates().await.unwrap().len(), 5);
    assert_eq!(r.template(&custom.id).await.unwrap().unwrap().name, "Mine");

    r.set_active_template(&custom.id).await.unwrap();
    r.delete_template(&custom.id).await.unwrap();
    assert_eq!(r.templates().await.unwrap().len(), 4);
    assert_eq!(r.active_template().await.unwrap().id, template::MODERN_STANDARD);

    assert!(r.create_custom_template("x", "", "missing").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn editing_the_active_template_refreshes_it() {
    let r = repo();
    let mut custom = r
      .create_custom_template("Mine", "", template::MODERN_STANDARD)
      .await
      .unwrap()
      .unwrap();
    r.set_active_template(&custom.id).await.unwrap();

    custom.settings.show_watermark = true;
    custom.settings.watermark_text = "PAID".into();
    r.save_template(custom.clone()).await.unwrap();
    assert_eq!(r.active_template().await.unwrap().settings.watermark(), Some("PAID"));

    custom.settings.primary_color = "crimson".into();
    assert!(matches!(r.save_template(custom).await, Err(Error::Validation(_))));
    assert_eq!(r.active_template().await.unwrap().settings.primary_color.as_str(), "#1a1a1a");
  }
}
