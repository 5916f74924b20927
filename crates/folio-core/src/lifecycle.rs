//! Invoice numbering and quotation-to-invoice conversion.
//!
//! The counter update is a plain read-increment-write against the store.
//! Two writers racing on the same store can hand out the same number; a
//! single writer per store is assumed.

use chrono::{Duration, Utc};

use crate::{
  document::{Invoice, InvoiceStatus},
  store::{keys, KeyValueStore},
  Error, Repository, Result,
};

/// Days between an invoice's date and its due date on conversion.
pub const PAYMENT_TERM_DAYS: i64 = 30;

/// `INV-` followed by the counter, zero-padded to at least three digits.
pub fn format_invoice_number(n: u64) -> String { format!("INV-{n:03}") }

impl<S: KeyValueStore> Repository<S> {
  /// The counter value last handed out, `0` if none has been.
  pub async fn invoice_counter(&self) -> Result<u64> {
    let raw = self
      .store()
      .get(keys::INVOICE_COUNTER)
      .await
      .map_err(Error::store)?;
    match raw {
      None => Ok(0),
      Some(s) => s.trim().parse().map_err(|_| {
        tracing::warn!(value = %s, "stored invoice counter is not an integer");
        Error::InvalidCounter(s.clone())
      }),
    }
  }

  /// Advance the persisted counter and return the new invoice number.
  pub async fn next_invoice_number(&self) -> Result<String> {
    let next = self.invoice_counter().await? + 1;
    self
      .store()
      .set(keys::INVOICE_COUNTER, next.to_string())
      .await
      .map_err(Error::store)?;
    tracing::debug!(counter = next, "advanced invoice counter");
    Ok(format_invoice_number(next))
  }

  /// Issue a draft invoice from quotation `quotation_id`.
  ///
  /// Customer details, line items and amounts are copied as they stand.
  /// The invoice is dated today, due [`PAYMENT_TERM_DAYS`] later, and keeps a
  /// back-reference to the quotation. The quotation itself is not modified.
  /// `None` if the quotation does not exist; the counter is then untouched.
  pub async fn convert_quotation_to_invoice(&self, quotation_id: &str) -> Result<Option<Invoice>> {
    let Some(quotation) = self.quotation(quotation_id).await? else {
      return Ok(None);
    };

    let number = self.next_invoice_number().await?;
    let today = Utc::now().date_naive();

    let mut invoice = Invoice::new(
      number,
      quotation.customer_name,
      quotation.customer_contact,
      today,
      quotation.amounts,
    );
    invoice.due_date = Some(today + Duration::days(PAYMENT_TERM_DAYS));
    invoice.status = InvoiceStatus::Draft;
    invoice.quotation_id = Some(quotation.id);
    invoice.custom_fields = quotation.custom_fields;

    let invoice = self.save(invoice).await?;
    tracing::info!(
      invoice = %invoice.invoice_number,
      quotation = quotation_id,
      "converted quotation to invoice"
    );
    Ok(Some(invoice))
  }
}
