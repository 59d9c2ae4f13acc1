//! Component behavior factory registry.
//!
//! The seam a dynamic plugin loader would plug into: a component `type`
//! string maps to a constructor receiving the component id and its opaque
//! task configuration. In-process registration replaces the shared-library
//! ABI; everything downstream of construction is identical.

use std::collections::HashMap;

use crate::error::{Result, SimlinkError};

use super::Behavior;

type Factory = Box<dyn Fn(&str, &serde_yaml::Value) -> Result<Box<dyn Behavior>> + Send + Sync>;

/// Maps component `type` names to behavior constructors.
#[derive(Default)]
pub struct BehaviorRegistry {
  factories: HashMap<String, Factory>,
}

impl BehaviorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a constructor for a component type.
  pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
  where
    F: Fn(&str, &serde_yaml::Value) -> Result<Box<dyn Behavior>> + Send + Sync + 'static,
  {
    self.factories.insert(type_name.into(), Box::new(factory));
  }

  /// Construct a behavior for a component declaration.
  pub fn create(&self, type_name: &str, id: &str, task: &serde_yaml::Value) -> Result<Box<dyn Behavior>> {
    let factory = self.factories.get(type_name).ok_or_else(|| {
      SimlinkError::Config(format!(
        "no behavior registered for component type [{type_name}]"
      ))
    })?;
    factory(id, task)
  }

  pub fn registered_types(&self) -> Vec<&str> {
    self.factories.keys().map(String::as_str).collect()
  }
}
