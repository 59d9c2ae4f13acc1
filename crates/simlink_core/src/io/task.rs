//! YAML task files, passed through to component behaviors opaquely.

use std::path::Path;

use crate::error::{Result, SimlinkError};

/// Parse a task file into a YAML value the behavior interprets itself.
pub fn load_task(path: impl AsRef<Path>) -> Result<serde_yaml::Value> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path).map_err(|e| {
    SimlinkError::Config(format!("cannot read task file [{}]: {e}", path.display()))
  })?;
  serde_yaml::from_str(&text).map_err(|e| {
    SimlinkError::Config(format!("malformed task file [{}]: {e}", path.display()))
  })
}
