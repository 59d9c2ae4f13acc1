//! Exchange items: the typed ports data flows through.
//!
//! Items live in the arena owned by the link graph; cross-item edges are
//! plain ids and act as weak references. An id whose slot has been cleared
//! by `finish()` is stale and gets skipped during pulls.

pub mod adaptors;
pub mod compat;

pub use adaptors::{AdaptedOutput, AdaptorKind};

use crate::element::ElementSet;
use crate::quantity::Quantity;
use crate::time::TimeSet;
use crate::values::{ScalarKind, ValueSet2D};

/// Index of a component slot in the link graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) usize);

/// Index of an output slot in the link graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputId(pub(crate) usize);

/// Index of an input slot in the link graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputId(pub(crate) usize);

/// Index of an adapted-output slot in the link graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdaptorId(pub(crate) usize);

/// A pullable producer: a plain output or an adapted output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderRef {
  Output(OutputId),
  Adapted(AdaptorId),
}

/// Payload common to inputs and outputs: a value definition, an element set,
/// a time set and the value grid, plus the owning component.
#[derive(Clone, Debug)]
pub struct ExchangeItem {
  pub id: String,
  pub caption: String,
  pub description: String,
  pub quantity: Quantity,
  pub element_set: ElementSet,
  pub time_set: TimeSet,
  pub values: ValueSet2D,
  pub component: ComponentId,
}

impl ExchangeItem {
  pub fn new(
    id: impl Into<String>,
    quantity: Quantity,
    element_set: ElementSet,
    time_set: TimeSet,
    component: ComponentId,
  ) -> Self {
    let values = ValueSet2D::new(ScalarKind::Real, Some(quantity.clone()));
    Self {
      id: id.into(),
      caption: String::new(),
      description: String::new(),
      quantity,
      element_set,
      time_set,
      values,
      component,
    }
  }
}

/// An output exchange item delivering values to consumers.
#[derive(Clone, Debug)]
pub struct OutputItem {
  pub item: ExchangeItem,
  /// Weak edges to consuming inputs.
  pub consumers: Vec<InputId>,
  /// Strong edges to the adapted outputs wrapping this output.
  pub adaptors: Vec<AdaptorId>,
  /// Cleared by `finish()`; stale ids pointing here are skipped.
  pub alive: bool,
}

impl OutputItem {
  pub fn new(item: ExchangeItem) -> Self {
    Self {
      item,
      consumers: Vec::new(),
      adaptors: Vec::new(),
      alive: true,
    }
  }
}

/// An input exchange item accepting values from providers.
#[derive(Clone, Debug)]
pub struct InputItem {
  pub item: ExchangeItem,
  /// Weak edges to providing outputs or adapted outputs.
  pub providers: Vec<ProviderRef>,
  pub alive: bool,
}

impl InputItem {
  pub fn new(item: ExchangeItem) -> Self {
    Self {
      item,
      providers: Vec::new(),
      alive: true,
    }
  }
}
