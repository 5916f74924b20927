//! Quotations, invoices and their shared line-item arithmetic.
//!
//! Totals are derived, never entered. [`QuotationItem::total`] always equals
//! `quantity * unit_price`, and an [`Amounts`] block always satisfies
//! `subtotal = Σ item.total` and `total = subtotal + tax`. Both invariants are
//! maintained by keeping the fields private and recomputing on every
//! mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{catalog::CatalogItem, profile::Customer, Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a quotation stands with the customer.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuotationStatus {
  #[default]
  Draft,
  Sent,
  Accepted,
  Rejected,
}

/// Payment state of an invoice.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InvoiceStatus {
  #[default]
  Draft,
  Sent,
  Paid,
  Overdue,
}

// ─── QuotationItem ───────────────────────────────────────────────────────────

/// One line of a quotation or invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredItem")]
pub struct QuotationItem {
  id:         String,
  name:       String,
  quantity:   Decimal,
  unit_price: Decimal,
  total:      Decimal,
}

/// The persisted shape; any stored `total` is ignored and recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredItem {
  id:         String,
  name:       String,
  quantity:   Decimal,
  unit_price: Decimal,
}

impl From<StoredItem> for QuotationItem {
  fn from(s: StoredItem) -> Self {
    let mut item = Self {
      id:         s.id,
      name:       s.name,
      quantity:   s.quantity,
      unit_price: s.unit_price,
      total:      Decimal::ZERO,
    };
    item.recompute();
    item
  }
}

impl QuotationItem {
  pub fn new(name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
    Self::with_id(Uuid::new_v4().to_string(), name, quantity, unit_price)
  }

  pub fn with_id(
    id: impl Into<String>,
    name: impl Into<String>,
    quantity: Decimal,
    unit_price: Decimal,
  ) -> Self {
    let mut item = Self {
      id: id.into(),
      name: name.into(),
      quantity,
      unit_price,
      total: Decimal::ZERO,
    };
    item.recompute();
    item
  }

  /// Pre-fill a line from a catalog entry.
  pub fn from_catalog(entry: &CatalogItem, quantity: Decimal) -> Self {
    Self::new(entry.name.clone(), quantity, entry.unit_price)
  }

  fn recompute(&mut self) { self.total = self.quantity * self.unit_price; }

  pub fn id(&self) -> &str { &self.id }
  pub fn name(&self) -> &str { &self.name }
  pub fn quantity(&self) -> Decimal { self.quantity }
  pub fn unit_price(&self) -> Decimal { self.unit_price }
  pub fn total(&self) -> Decimal { self.total }

  pub fn set_name(&mut self, name: impl Into<String>) { self.name = name.into(); }

  pub fn set_quantity(&mut self, quantity: Decimal) {
    self.quantity = quantity;
    self.recompute();
  }

  pub fn set_unit_price(&mut self, unit_price: Decimal) {
    self.unit_price = unit_price;
    self.recompute();
  }
}

// ─── Amounts ─────────────────────────────────────────────────────────────────

/// Line items plus the figures derived from them.
///
/// `tax_rate` is a percentage. A rate that is absent, zero or negative
/// means "no tax": both `tax_rate` and `tax_amount` are then `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredAmounts")]
pub struct Amounts {
  items:      Vec<QuotationItem>,
  subtotal:   Decimal,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  tax_rate:   Option<Decimal>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  tax_amount: Option<Decimal>,
  total:      Decimal,
}

/// The persisted shape; stored subtotal, tax and total are recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAmounts {
  items:    Vec<QuotationItem>,
  #[serde(default)]
  tax_rate: Option<Decimal>,
}

impl From<StoredAmounts> for Amounts {
  fn from(s: StoredAmounts) -> Self { Self::new(s.items, s.tax_rate) }
}

impl Default for Amounts {
  fn default() -> Self { Self::new(Vec::new(), None) }
}

impl Amounts {
  pub fn new(items: Vec<QuotationItem>, tax_rate: Option<Decimal>) -> Self {
    let mut amounts = Self {
      items,
      subtotal: Decimal::ZERO,
      tax_rate,
      tax_amount: None,
      total: Decimal::ZERO,
    };
    amounts.recompute();
    amounts
  }

  fn recompute(&mut self) {
    self.subtotal = self.items.iter().map(QuotationItem::total).sum();
    self.tax_rate = self.tax_rate.filter(|r| *r > Decimal::ZERO);
    self.tax_amount = self
      .tax_rate
      .map(|rate| self.subtotal * rate / Decimal::ONE_HUNDRED);
    self.total = self.subtotal + self.tax_amount.unwrap_or(Decimal::ZERO);
  }

  pub fn items(&self) -> &[QuotationItem] { &self.items }
  pub fn subtotal(&self) -> Decimal { self.subtotal }
  pub fn tax_rate(&self) -> Option<Decimal> { self.tax_rate }
  pub fn tax_amount(&self) -> Option<Decimal> { self.tax_amount }
  pub fn total(&self) -> Decimal { self.total }

  pub fn push_item(&mut self, item: QuotationItem) {
    self.items.push(item);
    self.recompute();
  }

  /// Remove the line with `id`. Returns whether a line was removed.
  pub fn remove_item(&mut self, id: &str) -> bool {
    let before = self.items.len();
    self.items.retain(|i| i.id != id);
    let removed = self.items.len() != before;
    if removed {
      self.recompute();
    }
    removed
  }

  /// Edit the line with `id` in place. Returns whether the line exists.
  pub fn update_item(&mut self, id: &str, edit: impl FnOnce(&mut QuotationItem)) -> bool {
    let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
      return false;
    };
    edit(item);
    self.recompute();
    true
  }

  pub fn set_tax_rate(&mut self, tax_rate: Option<Decimal>) {
    self.tax_rate = tax_rate;
    self.recompute();
  }

  fn validate(&self) -> Result<()> {
    if self.items.is_empty() {
      return Err(Error::validation("at least one line item is required"));
    }
    if self.items.iter().any(|i| i.name.trim().is_empty()) {
      return Err(Error::validation("every line item needs a name"));
    }
    if self
      .items
      .iter()
      .any(|i| i.quantity < Decimal::ZERO || i.unit_price < Decimal::ZERO)
    {
      return Err(Error::validation("quantities and prices cannot be negative"));
    }
    Ok(())
  }
}

fn validate_party(customer_name: &str, customer_contact: &str) -> Result<()> {
  if customer_name.trim().is_empty() || customer_contact.trim().is_empty() {
    return Err(Error::validation("customer name and contact are required"));
  }
  Ok(())
}

// ─── Quotation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
  pub id:               String,
  pub customer_name:    String,
  pub customer_contact: String,
  pub quotation_date:   NaiveDate,
  #[serde(flatten)]
  pub amounts:          Amounts,
  #[serde(default)]
  pub status:           QuotationStatus,
  /// Values for the active template's custom fields, keyed by field id.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub custom_fields:    BTreeMap<String, String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Quotation {
  pub fn new(
    customer_name: impl Into<String>,
    customer_contact: impl Into<String>,
    quotation_date: NaiveDate,
    amounts: Amounts,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: format!("quote-{}", Uuid::new_v4()),
      customer_name: customer_name.into(),
      customer_contact: customer_contact.into(),
      quotation_date,
      amounts,
      status: QuotationStatus::Draft,
      custom_fields: BTreeMap::new(),
      created_at: now,
      updated_at: now,
    }
  }

  /// A draft addressed to `customer`, snapshotting their name and contact.
  pub fn for_customer(customer: &Customer, quotation_date: NaiveDate, amounts: Amounts) -> Self {
    Self::new(customer.name.clone(), customer.contact_line(), quotation_date, amounts)
  }

  pub fn validate(&self) -> Result<()> {
    validate_party(&self.customer_name, &self.customer_contact)?;
    self.amounts.validate()
  }
}

// ─── Invoice ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
  pub id:               String,
  /// Human-readable sequential number, e.g. `INV-042`.
  pub invoice_number:   String,
  pub customer_name:    String,
  pub customer_contact: String,
  pub invoice_date:     NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date:         Option<NaiveDate>,
  #[serde(flatten)]
  pub amounts:          Amounts,
  #[serde(default)]
  pub status:           InvoiceStatus,
  /// Weak back-reference to the originating quotation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quotation_id:     Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub custom_fields:    BTreeMap<String, String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Invoice {
  pub fn new(
    invoice_number: impl Into<String>,
    customer_name: impl Into<String>,
    customer_contact: impl Into<String>,
    invoice_date: NaiveDate,
    amounts: Amounts,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: format!("inv-{}", Uuid::new_v4()),
      invoice_number: invoice_number.into(),
      customer_name: customer_name.into(),
      customer_contact: customer_contact.into(),
      invoice_date,
      due_date: None,
      amounts,
      status: InvoiceStatus::Draft,
      quotation_id: None,
      custom_fields: BTreeMap::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.invoice_number.trim().is_empty() {
      return Err(Error::validation("invoice number is required"));
    }
    validate_party(&self.customer_name, &self.customer_contact)?;
    self.amounts.validate()
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Either kind of business document, tagged with `"type"` when serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Document {
  Quotation(Quotation),
  Invoice(Invoice),
}

impl Document {
  pub fn id(&self) -> &str {
    match self {
      Self::Quotation(q) => &q.id,
      Self::Invoice(i) => &i.id,
    }
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    match self {
      Self::Quotation(q) => q.created_at,
      Self::Invoice(i) => i.created_at,
    }
  }

  pub fn customer_name(&self) -> &str {
    match self {
      Self::Quotation(q) => &q.customer_name,
      Self::Invoice(i) => &i.customer_name,
    }
  }

  pub fn customer_contact(&self) -> &str {
    match self {
      Self::Quotation(q) => &q.customer_contact,
      Self::Invoice(i) => &i.customer_contact,
    }
  }

  /// The document's own date (quotation date or invoice date).
  pub fn date(&self) -> NaiveDate {
    match self {
      Self::Quotation(q) => q.quotation_date,
      Self::Invoice(i) => i.invoice_date,
    }
  }

  pub fn amounts(&self) -> &Amounts {
    match self {
      Self::Quotation(q) => &q.amounts,
      Self::Invoice(i) => &i.amounts,
    }
  }

  pub fn custom_fields(&self) -> &BTreeMap<String, String> {
    match self {
      Self::Quotation(q) => &q.custom_fields,
      Self::Invoice(i) => &i.custom_fields,
    }
  }

  /// Status as display text, e.g. `"draft"`.
  pub fn status_label(&self) -> String {
    match self {
      Self::Quotation(q) => q.status.to_string(),
      Self::Invoice(i) => i.status.to_string(),
    }
  }

  /// `"QUOTATION"` or `"INVOICE"`.
  pub fn title(&self) -> &'static str {
    match self {
      Self::Quotation(_) => "QUOTATION",
      Self::Invoice(_) => "INVOICE",
    }
  }

  pub fn kind_label(&self) -> &'static str {
    match self {
      Self::Quotation(_) => "Quotation",
      Self::Invoice(_) => "Invoice",
    }
  }
}

impl From<Quotation> for Document {
  fn from(q: Quotation) -> Self { Self::Quotation(q) }
}

impl From<Invoice> for Document {
  fn from(i: Invoice) -> Self { Self::Invoice(i) }
}
