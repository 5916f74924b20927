//! Error types for `folio-core`.
//!
//! A missing record is never an error: lookups return `Option`. Errors are
//! reserved for rejected input, backend failures and corrupt stored data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected before anything was persisted.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("template {0:?} is a built-in default and cannot be modified or deleted")]
  DefaultTemplateImmutable(String),

  #[error("stored invoice counter is not an integer: {0:?}")]
  InvalidCounter(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Stored JSON could not be parsed. Not retried.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
