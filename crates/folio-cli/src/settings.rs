//! Configuration: an optional TOML file layered under `FOLIO_*` variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
  /// SQLite file holding all persisted state.
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Where exports and saved reports are written.
  #[serde(default = "default_output_dir")]
  pub output_dir:          PathBuf,
  #[serde(default = "default_export_timeout_secs")]
  pub export_timeout_secs: u64,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/folio/folio.db") }

fn default_output_dir() -> PathBuf { PathBuf::from(".") }

fn default_export_timeout_secs() -> u64 { 30 }

impl Default for FolioConfig {
  fn default() -> Self {
    Self {
      store_path:          default_store_path(),
      output_dir:          default_output_dir(),
      export_timeout_secs: default_export_timeout_secs(),
    }
  }
}

impl FolioConfig {
  /// Read `path` (if it exists) and the environment, then expand `~`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FOLIO"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut cfg: FolioConfig = settings
      .try_deserialize()
      .context("failed to deserialise FolioConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.output_dir = expand_tilde(&cfg.output_dir);
    Ok(cfg)
  }

  pub fn export_timeout(&self) -> Duration { Duration::from_secs(self.export_timeout_secs.max(1)) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = FolioConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.output_dir, PathBuf::from("."));
    assert_eq!(cfg.export_timeout(), Duration::from_secs(30));
    assert!(cfg.store_path.ends_with("folio/folio.db"));
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.toml");
    std::fs::write(&path, "store_path = \"/tmp/books.db\"\nexport_timeout_secs = 5\n").unwrap();

    let cfg = FolioConfig::load(&path).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/books.db"));
    assert_eq!(cfg.export_timeout_secs, 5);
    assert_eq!(cfg.output_dir, PathBuf::from("."));
  }

  #[test]
  fn tilde_only_expands_as_a_prefix() {
    assert_eq!(expand_tilde(Path::new("/abs/~/x")), PathBuf::from("/abs/~/x"));
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/books")), PathBuf::from(home).join("books"));
    }
  }
}
