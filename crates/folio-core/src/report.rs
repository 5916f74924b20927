//! Monthly invoice aggregation.
//!
//! Totals are taken from each invoice's stored total, whatever its status.

use chrono::{Datelike, Month};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
  document::Invoice,
  format::{format_currency, format_date},
};

/// Invoices dated within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
  /// 1 = January.
  pub month:          u32,
  pub year:           i32,
  pub total_invoices: usize,
  pub total_amount:   Decimal,
  pub invoices:       Vec<Invoice>,
}

impl MonthlyReport {
  /// Suggested file name for [`MonthlyReport::to_text`] output.
  pub fn file_name(&self) -> String {
    format!("Monthly-Report-{}-{}.txt", self.month_name(), self.year)
  }

  pub fn month_name(&self) -> &'static str {
    u8::try_from(self.month)
      .ok()
      .and_then(|m| Month::try_from(m).ok())
      .map_or("Unknown", |m| m.name())
  }

  /// A plain-text summary suitable for the terminal or a text export.
  pub fn to_text(&self) -> String {
    let mut out = format!(
      "{} {}: {} invoice{}, {}\n",
      self.month_name(),
      self.year,
      self.total_invoices,
      if self.total_invoices == 1 { "" } else { "s" },
      format_currency(self.total_amount),
    );
    for inv in &self.invoices {
      out.push_str(&format!(
        "  {:<10} {:<14} {:<24} {:>14}  {}\n",
        inv.invoice_number,
        format_date(inv.invoice_date),
        inv.customer_name,
        format_currency(inv.amounts.total()),
        inv.status,
      ));
    }
    out
  }
}

/// Headline figures for one year, alongside all-time totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
  pub year:                  i32,
  pub year_invoices:         usize,
  pub year_revenue:          Decimal,
  pub all_time_invoices:     usize,
  pub all_time_revenue:      Decimal,
  /// All-time revenue over all-time invoice count; zero with no invoices.
  pub average_invoice_value: Decimal,
  pub months:                Vec<MonthlyReport>,
}

/// Group `invoices` dated in `year` by month. Months with no invoices are
/// omitted; the rest come January first, each listing its invoices by date.
pub fn monthly_reports(invoices: &[Invoice], year: i32) -> Vec<MonthlyReport> {
  (1..=12)
    .filter_map(|month| {
      let mut matching: Vec<Invoice> = invoices
        .iter()
        .filter(|i| i.invoice_date.year() == year && i.invoice_date.month() == month)
        .cloned()
        .collect();
      if matching.is_empty() {
        return None;
      }
      matching.sort_by_key(|i| i.invoice_date);
      Some(MonthlyReport {
        month,
        year,
        total_invoices: matching.len(),
        total_amount: matching.iter().map(|i| i.amounts.total()).sum(),
        invoices: matching,
      })
    })
    .collect()
}

pub fn year_summary(invoices: &[Invoice], year: i32) -> YearSummary {
  let months = monthly_reports(invoices, year);
  let all_time_revenue: Decimal = invoices.iter().map(|i| i.amounts.total()).sum();
  let average_invoice_value = match invoices.len() {
    0 => Decimal::ZERO,
    n => all_time_revenue / Decimal::from(n),
  };
  YearSummary {
    year,
    year_invoices: months.iter().map(|m| m.total_invoices).sum(),
    year_revenue: months.iter().map(|m| m.total_amount).sum(),
    all_time_invoices: invoices.len(),
    all_time_revenue,
    average_invoice_value,
    months,
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rust_decimal_macros::dec;

  use super::*;
  use crate::document::{Amounts, InvoiceStatus, QuotationItem};

  fn invoice(number: &str, y: i32, m: u32, d: u32, total: Decimal) -> Invoice {
    Invoice::new(
      number,
      "Acme",
      "ops@acme.test",
      NaiveDate::from_ymd_opt(y, m, d).unwrap(),
      Amounts::new(vec![QuotationItem::new("x", dec!(1), total)], None),
    )
  }

  #[test]
  fn groups_by_month() {
    let mut paid = invoice("INV-003", 2024, 3, 20, dec!(25));
    paid.status = InvoiceStatus::Paid;
    let invoices = vec![
      invoice("INV-001", 2024, 3, 1, dec!(100)),
      invoice("INV-002", 2024, 3, 15, dec!(50)),
      paid,
      invoice("INV-004", 2024, 1, 9, dec!(10)),
      invoice("INV-005", 2023, 3, 9, dec!(999)),
    ];

    let reports = monthly_reports(&invoices, 2024);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].month, 1);
    assert_eq!(reports[0].month_name(), "January");

    let march = &reports[1];
    assert_eq!(march.month_name(), "March");
    assert_eq!(march.total_invoices, 3);
    assert_eq!(march.total_amount, dec!(175));

    let summary = year_summary(&invoices, 2024);
    assert_eq!(summary.year_invoices, 4);
    assert_eq!(summary.year_revenue, dec!(185));
    assert_eq!(summary.all_time_invoices, 5);
    assert_eq!(summary.all_time_revenue, dec!(1184));
    assert_eq!(summary.average_invoice_value, dec!(236.8));
  }

  #[test]
  fn empty_year_has_no_months() {
    assert!(monthly_reports(&[], 2024).is_empty());
    let summary = year_summary(&[], 2024);
    assert_eq!(summary.year_revenue, Decimal::ZERO);
    assert_eq!(summary.average_invoice_value, Decimal::ZERO);
  }

  #[test]
  fn text_summary() {
    let invoices = vec![invoice("INV-001", 2024, 3, 5, dec!(1234.5))];
    let text = monthly_reports(&invoices, 2024)[0].to_text();
    assert!(text.starts_with("March 2024: 1 invoice, $1,234.50\n"));
    assert!(text.contains("INV-001"));
    assert!(text.contains("March 5, 2024"));
    assert_eq!(monthly_reports(&invoices, 2024)[0].file_name(), "Monthly-Report-March-2024.txt");
  }
}
