//! Error kinds shared across the coupling runtime.
//!
//! One enum covers the whole library so pull recursion can propagate a single
//! error type through components, adaptors and loaders with `?`.

use thiserror::Error;

/// Errors raised by the coupling runtime.
#[derive(Debug, Error)]
pub enum SimlinkError {
  /// Malformed or missing link/task/mesh configuration. Fatal to the launcher.
  #[error("configuration error: {0}")]
  Config(String),

  /// Broken caller contract: out-of-range index, wrong value type, illegal
  /// state transition, mixed stamp/span insertion.
  #[error("contract violation: {0}")]
  ContractViolation(String),

  /// Exchange-item connection rejected; the connection attempt is reverted.
  #[error("incompatible exchange items: {0}")]
  IncompatibleItem(String),

  /// Mapper initialization or application failed.
  #[error("mapping failed: {reason}")]
  Mapping {
    reason: String,
    #[source]
    source: Option<Box<SimlinkError>>,
  },

  /// Mapping-matrix access outside `rows x cols`.
  #[error("index ({row}, {col}) outside mapping matrix of {rows} x {cols}")]
  Bounds {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
  },

  /// Time-buffer query outside the stored horizon with extrapolation disabled.
  #[error("requested time {requested} outside buffer horizon [{start}, {end}] and extrapolation is disabled")]
  OutOfHorizon {
    requested: f64,
    start: f64,
    end: f64,
  },

  /// Explicitly unimplemented combination or feature.
  #[error("not implemented: {0}")]
  NotImplemented(String),

  /// A component's `update()` could not advance.
  #[error("computation failed: {0}")]
  Computation(String),
}

impl SimlinkError {
  /// Wrap an error as the cause of a mapping failure.
  pub fn mapping(reason: impl Into<String>, source: SimlinkError) -> Self {
    Self::Mapping {
      reason: reason.into(),
      source: Some(Box::new(source)),
    }
  }

  /// A mapping failure without an underlying cause.
  pub fn mapping_plain(reason: impl Into<String>) -> Self {
    Self::Mapping {
      reason: reason.into(),
      source: None,
    }
  }
}

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, SimlinkError>;
