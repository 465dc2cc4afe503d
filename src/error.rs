use std::io;

use thiserror::Error;

/// Errors raised while building pools or loading their configuration.
///
/// Allocation itself never produces a `PoolError`: exhaustion is reported as `None`.
#[derive(Error, Debug)]
pub enum PoolError {
  /// The operating system refused to map the memory bulk.
  #[error("failed to map a {size} byte memory bulk")]
  BulkMap {
    /// Requested bulk size in bytes.
    size: usize,
    /// Error reported by `mmap`.
    #[source]
    source: io::Error,
  },

  /// Slot id outside of the registry table.
  #[error("slot {0} is out of range (the registry holds 256 slots)")]
  InvalidSlot(usize),

  /// The registry configuration could not be read.
  #[error("failed to read registry configuration")]
  ConfigIo(#[from] io::Error),

  /// The registry configuration is not valid TOML.
  #[error("invalid registry configuration: {0}")]
  Config(#[from] toml::de::Error),
}
