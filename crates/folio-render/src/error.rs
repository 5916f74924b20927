//! Error type for `folio-render`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] folio_core::Error),

  #[error("pdf encoding error: {0}")]
  Pdf(#[from] lopdf::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("writing {} did not finish within {secs}s", path.display())]
  ExportTimedOut { path: PathBuf, secs: u64 },

  /// An explicitly requested template does not exist.
  #[error("template not found: {0}")]
  TemplateNotFound(String),

  #[error("document not found: {0}")]
  DocumentNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
