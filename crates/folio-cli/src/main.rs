//! `folio`: quotations, invoices and document templates from the terminal.
//!
//! # Usage
//!
//! ```text
//! folio profile set --name "Acme Studio" --email hello@acme.test --logo logo.png
//! folio quote new --name "Jane Doe" --contact jane@example.com --item "Design:2:50" --tax-rate 10
//! folio convert quote-6f1c...
//! folio template use classic-professional
//! folio template set template-9d2e... primaryColor=#0f766e showWatermark=true margins.top=25
//! folio quote edit quote-6f1c... --set-item 3b1a...:4: --tax-rate 8
//! folio export inv-93ab... --out ~/invoices
//! folio report 2024 --month 3 --save
//! ```
//!
//! Settings come from `folio.toml` (or `--config`) and `FOLIO_*` variables:
//! `store_path`, `output_dir` and `export_timeout_secs`.

mod cli;
mod commands;
mod settings;

use anyhow::Context as _;
use clap::Parser;
use folio_core::Repository;
use folio_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{cli::Cli, settings::FolioConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries command output.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = FolioConfig::load(&cli.config)?;

  let store_path = cli
    .store
    .as_deref()
    .map(settings::expand_tilde)
    .unwrap_or_else(|| cfg.store_path.clone());
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(store = %store_path.display(), "store ready");

  commands::run(&Repository::new(store), &cfg, cli.command).await
}
