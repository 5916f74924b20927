//! Export: resolve what to render, name the file, and write it out.
//!
//! Writing is awaited with a bounded timeout; a save that does not finish
//! in time fails with [`Error::ExportTimedOut`] rather than hanging.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use folio_core::{
  document::Document, profile::CompanyProfile, store::KeyValueStore, template::DocumentTemplate,
  Repository,
};

use crate::{compose, html, pdf, Error, PagedDocument, Result};

/// Default upper bound on a single file write.
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path separators would escape the output directory.
fn file_safe(part: &str) -> String {
  part.trim().replace(['/', '\\'], "-")
}

/// `Quotation-{customer}-{date}.pdf` or `Invoice-{number}-{customer}.pdf`.
pub fn export_file_name(document: &Document) -> String {
  match document {
    Document::Quotation(q) => {
      format!("Quotation-{}-{}.pdf", file_safe(&q.customer_name), q.quotation_date)
    }
    Document::Invoice(i) => {
      format!("Invoice-{}-{}.pdf", file_safe(&i.invoice_number), file_safe(&i.customer_name))
    }
  }
}

// ─── RenderJob ───────────────────────────────────────────────────────────────

/// Everything one render needs, loaded up front.
#[derive(Debug, Clone)]
pub struct RenderJob {
  pub document: Document,
  pub template: DocumentTemplate,
  pub profile:  Option<CompanyProfile>,
}

impl RenderJob {
  pub fn new(document: Document, template: DocumentTemplate, profile: Option<CompanyProfile>) -> Self {
    Self { document, template, profile }
  }

  /// Load a document with either the named template or the active one.
  pub async fn load<S: KeyValueStore>(
    repo: &Repository<S>,
    document_id: &str,
    template_id: Option<&str>,
  ) -> Result<Self> {
    let document = repo
      .document(document_id)
      .await?
      .ok_or_else(|| Error::DocumentNotFound(document_id.to_owned()))?;
    let template = match template_id {
      Some(id) => repo
        .template(id)
        .await?
        .ok_or_else(|| Error::TemplateNotFound(id.to_owned()))?,
      None => repo.active_template().await?,
    };
    let profile = repo.company_profile().await?;
    Ok(Self { document, template, profile })
  }

  pub fn layout(&self) -> PagedDocument {
    compose::render(&self.document, &self.template, self.profile.as_ref())
  }

  pub fn to_pdf(&self) -> Result<Vec<u8>> { pdf::to_pdf_bytes(&self.layout()) }

  pub fn to_html(&self) -> String {
    html::render_html(&self.document, &self.template, self.profile.as_ref())
  }

  pub fn file_name(&self) -> String { export_file_name(&self.document) }

  /// Render to PDF and save it under `dir`. Returns the written path.
  pub async fn export(&self, dir: &Path, limit: Duration) -> Result<PathBuf> {
    let bytes = self.to_pdf()?;
    let path = save_file(dir, &self.file_name(), bytes, limit).await?;
    tracing::info!(
      document = self.document.id(),
      template = %self.template.id,
      path = %path.display(),
      "exported document"
    );
    Ok(path)
  }
}

/// Write `bytes` to `dir/name`, creating `dir` if needed.
pub async fn save_file(dir: &Path, name: &str, bytes: Vec<u8>, limit: Duration) -> Result<PathBuf> {
  let path = dir.join(name);
  let write = async {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, bytes).await
  };
  match tokio::time::timeout(limit, write).await {
    Ok(result) => result?,
    Err(_) => {
      return Err(Error::ExportTimedOut { path, secs: limit.as_secs() });
    }
  }
  tracing::debug!(path = %path.display(), "saved file");
  Ok(path)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use folio_core::{
    document::{Amounts, Invoice, Quotation, QuotationItem},
    profile::CompanyProfile,
    store::MemoryStore,
    template,
  };
  use rust_decimal_macros::dec;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 5).unwrap() }

  fn amounts() -> Amounts { Amounts::new(vec![QuotationItem::new("Design", dec!(1), dec!(100))], None) }

  #[test]
  fn file_names_follow_document_kind() {
    let q: Document = Quotation::new("Jane Doe", "jane@example.com", date(), amounts()).into();
    assert_eq!(export_file_name(&q), "Quotation-Jane Doe-2024-03-05.pdf");

    let i: Document = Invoice::new("INV-004", "Jane Doe", "jane@example.com", date(), amounts()).into();
    assert_eq!(export_file_name(&i), "Invoice-INV-004-Jane Doe.pdf");
  }

  #[test]
  fn file_names_cannot_escape_the_directory() {
    let q: Document = Quotation::new("../etc/passwd", "x", date(), amounts()).into();
    assert!(!export_file_name(&q).contains('/'));
  }

  #[tokio::test]
  async fn load_reports_missing_document_and_template() {
    let repo = Repository::new(MemoryStore::new());
    assert!(matches!(
      RenderJob::load(&repo, "quote-missing", None).await,
      Err(Error::DocumentNotFound(id)) if id == "quote-missing"
    ));

    let saved = repo.save(Quotation::new("Jane", "j@x.com", date(), amounts())).await.unwrap();
    assert!(matches!(
      RenderJob::load(&repo, &saved.id, Some("template-nope")).await,
      Err(Error::TemplateNotFound(_))
    ));
  }

  #[tokio::test]
  async fn load_uses_active_template_by_default() {
    let repo = Repository::new(MemoryStore::new());
    let saved = repo.save(Quotation::new("Jane", "j@x.com", date(), amounts())).await.unwrap();

    let job = RenderJob::load(&repo, &saved.id, None).await.unwrap();
    assert_eq!(job.template.id, template::MODERN_STANDARD);
    assert!(job.profile.is_none());

    repo.set_active_template(template::MINIMAL_CLEAN).await.unwrap();
    repo.save_company_profile(CompanyProfile::new("Acme")).await.unwrap();
    let job = RenderJob::load(&repo, &saved.id, None).await.unwrap();
    assert_eq!(job.template.id, template::MINIMAL_CLEAN);
    assert_eq!(job.profile.unwrap().company_name, "Acme");

    let job = RenderJob::load(&repo, &saved.id, Some(template::CLASSIC_PROFESSIONAL)).await.unwrap();
    assert_eq!(job.template.id, template::CLASSIC_PROFESSIONAL);
  }

  #[tokio::test]
  async fn export_writes_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports");
    let invoice = Invoice::new("INV-001", "Jane", "j@x.com", date(), amounts());
    let job = RenderJob::new(invoice.into(), template::fallback_template(), None);

    let path = job.export(&out, DEFAULT_EXPORT_TIMEOUT).await.unwrap();
    assert_eq!(path, out.join("Invoice-INV-001-Jane.pdf"));
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[tokio::test]
  async fn save_file_surfaces_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let err = save_file(&blocker, "a.pdf", vec![1], DEFAULT_EXPORT_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
  }
}
