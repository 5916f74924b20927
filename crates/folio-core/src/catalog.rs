//! Reusable line-item definitions and their categories.
//!
//! An item references its category by id only. The reference is weak: the
//! category may have been deleted, in which case lookups simply miss.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── CatalogItem ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
  pub id:          String,
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub unit_price:  Decimal,
  /// Id of an [`ItemCategory`]; may dangle.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sku:         Option<String>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl CatalogItem {
  pub fn new(name: impl Into<String>, unit_price: Decimal) -> Self {
    let now = Utc::now();
    Self {
      id: format!("item-{}", Uuid::new_v4()),
      name: name.into(),
      description: None,
      unit_price,
      category: None,
      sku: None,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() || self.unit_price <= Decimal::ZERO {
      return Err(Error::validation("item name and a positive price are required"));
    }
    Ok(())
  }

  /// Case-insensitive substring match over name, description, SKU and
  /// category id. `needle` must already be lowercase.
  pub(crate) fn matches(&self, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&self.name)
      || self.description.as_deref().is_some_and(hit)
      || self.sku.as_deref().is_some_and(hit)
      || self.category.as_deref().is_some_and(hit)
  }
}

// ─── ItemCategory ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategory {
  pub id:          String,
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl ItemCategory {
  pub fn new(name: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: format!("cat-{}", Uuid::new_v4()),
      name: name.into(),
      description: None,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("category name is required"));
    }
    Ok(())
  }
}

// ─── Seed data ───────────────────────────────────────────────────────────────

fn category(id: &str, name: &str, description: &str) -> ItemCategory {
  let now = Utc::now();
  ItemCategory {
    id: id.to_owned(),
    name: name.to_owned(),
    description: Some(description.to_owned()),
    is_active: true,
    created_at: now,
    updated_at: now,
  }
}

fn item(id: &str, name: &str, description: &str, price: Decimal, sku: &str) -> CatalogItem {
  let now = Utc::now();
  CatalogItem {
    id: id.to_owned(),
    name: name.to_owned(),
    description: Some(description.to_owned()),
    unit_price: price,
    category: Some("cat-services".to_owned()),
    sku: Some(sku.to_owned()),
    is_active: true,
    created_at: now,
    updated_at: now,
  }
}

/// Categories inserted into an empty catalog.
pub fn default_categories() -> Vec<ItemCategory> {
  vec![
    category("cat-services", "Services", "Professional services"),
    category("cat-products", "Products", "Physical products"),
    category("cat-materials", "Materials", "Raw materials and supplies"),
    category("cat-labor", "Labor", "Labor and installation"),
  ]
}

/// Items inserted into an empty catalog.
pub fn default_items() -> Vec<CatalogItem> {
  vec![
    item(
      "item-consultation",
      "Initial Consultation",
      "Initial project consultation and requirements gathering",
      Decimal::new(150_00, 2),
      "CONS-001",
    ),
    item(
      "item-design",
      "Design Service",
      "Professional design and mockup creation",
      Decimal::new(75_00, 2),
      "DES-001",
    ),
    item(
      "item-development",
      "Development Hour",
      "Custom software development per hour",
      Decimal::new(125_00, 2),
      "DEV-001",
    ),
    item(
      "item-hosting",
      "Web Hosting (Monthly)",
      "Shared web hosting service",
      Decimal::new(25_00, 2),
      "HOST-001",
    ),
    item(
      "item-domain",
      "Domain Registration (Yearly)",
      "Domain name registration for one year",
      Decimal::new(15_00, 2),
      "DOM-001",
    ),
  ]
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  #[test]
  fn item_requires_positive_price() {
    assert!(CatalogItem::new("Widget", dec!(1)).validate().is_ok());
    assert!(CatalogItem::new("Widget", dec!(0)).validate().is_err());
    assert!(CatalogItem::new("Widget", dec!(-5)).validate().is_err());
    assert!(CatalogItem::new(" ", dec!(5)).validate().is_err());
  }

  #[test]
  fn matches_covers_sku_and_category() {
    let mut item = CatalogItem::new("Widget", dec!(1));
    item.sku = Some("WDG-9".into());
    item.category = Some("cat-products".into());

    assert!(item.matches("widg"));
    assert!(item.matches("wdg-9"));
    assert!(item.matches("products"));
    assert!(!item.matches("gadget"));
  }

  #[test]
  fn seed_items_reference_seed_categories() {
    let cats = default_categories();
    for item in default_items() {
      let cat = item.category.as_deref().unwrap();
      assert!(cats.iter().any(|c| c.id == cat));
    }
  }
}
