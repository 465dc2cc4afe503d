//! # Registry Configuration
//!
//! Pools are sized once at startup from a TOML file:
//!
//! ```toml
//! [[slot]]
//! id = 0
//! size = 65536
//!
//! [[slot]]
//! id = 1
//! size = 4096
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::PoolError;

/// Pools to create, one entry per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
  #[serde(rename = "slot", default)]
  pub slots: Vec<SlotConfig>,
}

/// Requested size for one registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotConfig {
  pub id: usize,
  /// Requested bulk size in bytes, promoted or clamped by the pool.
  pub size: usize,
}

impl RegistryConfig {
  pub fn from_toml_str(source: &str) -> Result<Self, PoolError> {
    Ok(toml::from_str(source)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, PoolError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loading registry configuration");
    Self::from_toml_str(&source)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_slots() {
    let config = RegistryConfig::from_toml_str(
      r#"
        [[slot]]
        id = 0
        size = 65536

        [[slot]]
        id = 12
        size = 1000
      "#,
    )
    .unwrap();

    assert_eq!(
      vec![SlotConfig { id: 0, size: 65536 }, SlotConfig { id: 12, size: 1000 }],
      config.slots
    );
  }

  #[test]
  fn test_empty_config() {
    assert_eq!(RegistryConfig::default(), RegistryConfig::from_toml_str("").unwrap());
  }

  #[test]
  fn test_rejects_unknown_fields() {
    let result = RegistryConfig::from_toml_str("[[slot]]\nid = 0\nsize = 16\nkind = \"buddy\"\n");
    assert!(matches!(result, Err(PoolError::Config(_))));
  }

  #[test]
  fn test_missing_file() {
    assert!(matches!(
      RegistryConfig::load("/nonexistent/bulkpool.toml"),
      Err(PoolError::ConfigIo(_))
    ));
  }
}
