//! The company profile singleton and customer records.
//!
//! Documents never hold a live reference to a customer; they snapshot the
//! customer's name and contact line when created. Deleting a customer does
//! not touch any quotation or invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── CompanyProfile ──────────────────────────────────────────────────────────

/// Identity, address, contact, banking and tax details of the issuing
/// business. Blank strings and `None` are both treated as "not provided".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
  pub id:                  String,
  pub company_name:        String,
  #[serde(default)]
  pub company_address:     String,
  #[serde(default)]
  pub company_city:        String,
  #[serde(default)]
  pub company_state:       String,
  #[serde(default)]
  pub company_zip:         String,
  #[serde(default)]
  pub company_country:     String,
  #[serde(default)]
  pub company_phone:       String,
  #[serde(default)]
  pub company_email:       String,
  #[serde(default)]
  pub company_website:     String,
  /// Base64 image, either bare or as a `data:` URL.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_logo:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tax_id:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub registration_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank_name:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank_account:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank_routing:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payment_terms:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:               Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

/// `Some(s)` only when `s` has visible content.
pub(crate) fn present(s: &Option<String>) -> Option<&str> {
  s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(s: &str) -> Option<&str> {
  let s = s.trim();
  (!s.is_empty()).then_some(s)
}

impl CompanyProfile {
  /// A profile with only the company name filled in.
  pub fn new(company_name: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: "company".to_owned(),
      company_name: company_name.into(),
      company_address: String::new(),
      company_city: String::new(),
      company_state: String::new(),
      company_zip: String::new(),
      company_country: String::new(),
      company_phone: String::new(),
      company_email: String::new(),
      company_website: String::new(),
      company_logo: None,
      tax_id: None,
      registration_number: None,
      bank_name: None,
      bank_account: None,
      bank_routing: None,
      payment_terms: None,
      notes: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.company_name.trim().is_empty() {
      return Err(Error::validation("company name is required"));
    }
    Ok(())
  }

  /// Postal address as display lines, skipping whatever is blank.
  ///
  /// The middle line is `City, State Zip` with separators dropped around
  /// missing parts.
  pub fn address_lines(&self) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(street) = non_blank(&self.company_address) {
      lines.push(street.to_owned());
    }

    let state_zip = [non_blank(&self.company_state), non_blank(&self.company_zip)]
      .into_iter()
      .flatten()
      .collect::<Vec<_>>()
      .join(" ");
    let locality = match (non_blank(&self.company_city), state_zip.is_empty()) {
      (Some(city), false) => format!("{city}, {state_zip}"),
      (Some(city), true) => city.to_owned(),
      (None, _) => state_zip,
    };
    if !locality.is_empty() {
      lines.push(locality);
    }

    if let Some(country) = non_blank(&self.company_country) {
      lines.push(country.to_owned());
    }
    lines
  }

  /// `Phone: …`, `Email: …` and `Web: …` lines for whatever is present.
  pub fn contact_lines(&self) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(phone) = non_blank(&self.company_phone) {
      lines.push(format!("Phone: {phone}"));
    }
    if let Some(email) = non_blank(&self.company_email) {
      lines.push(format!("Email: {email}"));
    }
    if let Some(web) = non_blank(&self.company_website) {
      lines.push(format!("Web: {web}"));
    }
    lines
  }

  pub fn logo(&self) -> Option<&str> { present(&self.company_logo) }
  pub fn tax_id(&self) -> Option<&str> { present(&self.tax_id) }
  pub fn registration_number(&self) -> Option<&str> { present(&self.registration_number) }
  pub fn bank_name(&self) -> Option<&str> { present(&self.bank_name) }
  pub fn bank_account(&self) -> Option<&str> { present(&self.bank_account) }
  pub fn bank_routing(&self) -> Option<&str> { present(&self.bank_routing) }
  pub fn payment_terms(&self) -> Option<&str> { present(&self.payment_terms) }
  pub fn notes(&self) -> Option<&str> { present(&self.notes) }

  pub fn has_bank_info(&self) -> bool {
    self.bank_name().is_some() || self.bank_account().is_some() || self.bank_routing().is_some()
  }
}

// ─── Customer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id:         String,
  pub name:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company:    Option<String>,
  pub email:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub zip:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub country:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tax_id:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:      Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Customer {
  pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: format!("cust-{}", Uuid::new_v4()),
      name: name.into(),
      company: None,
      email: email.into(),
      phone: None,
      address: None,
      city: None,
      state: None,
      zip: None,
      country: None,
      tax_id: None,
      notes: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() || self.email.trim().is_empty() {
      return Err(Error::validation("customer name and email are required"));
    }
    Ok(())
  }

  /// The contact string snapshotted onto documents: email, then phone.
  pub fn contact_line(&self) -> String {
    match present(&self.phone) {
      Some(phone) => format!("{} / {phone}", self.email.trim()),
      None => self.email.trim().to_owned(),
    }
  }
}
