//! Simulation components and their lifecycle.
//!
//! A component is a slot in the link graph pairing framework state (status,
//! time extent, exchange-item ids) with a [`Behavior`], the engine-specific
//! part a model plugs in. The status machine follows the lifecycle
//!
//! ```text
//! Created -> Initializing -> Initialized -> Validating -> {Valid | Invalid}
//! Valid -> Preparing -> Updated
//! Updated -> WaitingForData -> Updating -> {Updated | Done | Failed}
//! {Updated, Done, Failed} -> Finishing -> Finished
//! {Updated} -> Finishing -> Created            (restartable)
//! ```
//!
//! and every other transition is rejected.

pub mod events;
pub mod graph;
pub mod iteration;
pub mod registry;

#[cfg(test)]
pub mod test_utils;

pub use events::{Event, EventBus};
pub use graph::LinkGraph;
pub use iteration::{IterationConfig, IterationController};
pub use registry::BehaviorRegistry;

use crate::element::ElementSet;
use crate::error::{Result, SimlinkError};
use crate::exchange::{InputId, OutputId};
use crate::quantity::Quantity;
use crate::time::{Time, TimeSet};
use crate::values::ValueSet2D;

/// Lifecycle status of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
  Created,
  Initializing,
  Initialized,
  Validating,
  Valid,
  Invalid,
  Preparing,
  Updated,
  Updating,
  WaitingForData,
  Done,
  Finishing,
  Finished,
  Failed,
}

impl Status {
  /// Whether moving to `next` is a legal lifecycle transition.
  pub fn can_transition_to(self, next: Status) -> bool {
    use Status::*;
    matches!(
      (self, next),
      (Created, Initializing)
        | (Initializing, Initialized)
        | (Initialized, Validating)
        | (Validating, Valid)
        | (Validating, Invalid)
        | (Valid, Preparing)
        | (Preparing, Updated)
        | (Updated, WaitingForData)
        | (Updated, Finishing)
        | (WaitingForData, Updating)
        | (Updating, Updated)
        | (Updating, Done)
        | (Updating, Failed)
        | (Done, Finishing)
        | (Failed, Finishing)
        | (Finishing, Finished)
        | (Finishing, Created)
    )
  }

  /// True once no further `update()` will have any effect.
  pub fn is_terminal(self) -> bool {
    matches!(self, Status::Done | Status::Finished | Status::Failed)
  }
}

/// Opaque handle to a behavior-kept state snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateId(pub String);

/// Declaration of one exchange item made during initialization.
#[derive(Clone, Debug)]
pub struct ItemSpec {
  pub id: String,
  pub quantity: Quantity,
  pub element_set: ElementSet,
  /// The times the item wants data at; usually empty for outputs, which
  /// accumulate times as the component steps.
  pub time_set: TimeSet,
}

/// What a behavior declares about itself during `Initialize`.
#[derive(Clone, Debug)]
pub struct ComponentSpec {
  pub caption: String,
  pub description: String,
  /// Two-stamp set whose horizon is the component's simulation window.
  pub time_extent: TimeSet,
  pub outputs: Vec<ItemSpec>,
  pub inputs: Vec<ItemSpec>,
}

/// Result of one successful time step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
  /// The component's new current time; must advance the clock.
  pub new_time: Time,
  /// One row of element values per output item id.
  pub output_values: Vec<(String, Vec<f64>)>,
}

/// The engine-specific half of a component.
///
/// The link graph drives the lifecycle and the data pulls; the behavior
/// supplies item declarations, consumes pulled input values and advances the
/// model clock.
pub trait Behavior: Send {
  /// Declare exchange items and the simulation window.
  fn on_initialize(&mut self) -> Result<ComponentSpec>;

  /// Engine-specific validation; a non-empty list marks the component
  /// Invalid.
  fn on_validate(&self) -> Vec<String> {
    Vec::new()
  }

  /// Runs between Valid and Updated, once connections exist.
  fn on_prepare(&mut self) -> Result<()> {
    Ok(())
  }

  /// Output rows published at the start time during preparation, before any
  /// step has run. One row of element values per output item id.
  fn initial_output_values(&mut self) -> Vec<(String, Vec<f64>)> {
    Vec::new()
  }

  /// Receive the summed values pulled for one input item.
  fn apply_input(&mut self, input_id: &str, values: &ValueSet2D) -> Result<()>;

  /// Advance one time step from `now`.
  fn perform_step(&mut self, now: Time) -> Result<StepOutcome>;

  /// Runs while the component is Finishing.
  fn on_finish(&mut self) {}

  // State management used by iterative coupling. Behaviors that cannot
  // snapshot keep the defaults.

  fn keep_state(&mut self) -> Result<StateId> {
    Err(SimlinkError::NotImplemented("keep_state".into()))
  }

  fn restore_state(&mut self, _state: &StateId) -> Result<()> {
    Err(SimlinkError::NotImplemented("restore_state".into()))
  }

  fn clear_state(&mut self, _state: &StateId) -> Result<()> {
    Err(SimlinkError::NotImplemented("clear_state".into()))
  }
}

/// A component slot in the link graph.
pub struct ComponentState {
  pub id: String,
  pub caption: String,
  pub description: String,
  pub status: Status,
  pub time_extent: TimeSet,
  pub current_time: Option<Time>,
  pub inputs: Vec<InputId>,
  pub outputs: Vec<OutputId>,
  /// Keeps pulled input rows alive across redone steps under iteration.
  pub retirement_disabled: bool,
  pub(crate) behavior: Box<dyn Behavior>,
}

impl ComponentState {
  pub(crate) fn new(id: impl Into<String>, behavior: Box<dyn Behavior>) -> Self {
    Self {
      id: id.into(),
      caption: String::new(),
      description: String::new(),
      status: Status::Created,
      time_extent: TimeSet::new(),
      current_time: None,
      inputs: Vec::new(),
      outputs: Vec::new(),
      retirement_disabled: false,
      behavior,
    }
  }

  /// Start of the simulation window.
  pub fn start_time(&self) -> Option<Time> {
    self.time_extent.horizon().map(|h| Time::stamp(h.timestamp()))
  }

  /// End of the simulation window.
  pub fn end_time(&self) -> Option<Time> {
    self.time_extent.horizon().map(|h| Time::stamp(h.end()))
  }
}

impl std::fmt::Debug for ComponentState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ComponentState")
      .field("id", &self.id)
      .field("status", &self.status)
      .field("current_time", &self.current_time)
      .finish()
  }
}


#[cfg(test)]
#[path = "scenarios_test.rs"]
mod scenarios_test;
