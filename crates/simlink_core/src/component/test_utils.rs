//! Scripted behaviors shared by the component and scenario tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::element::ElementSet;
use crate::error::{Result, SimlinkError};
use crate::quantity::{Quantity, Unit};
use crate::time::{Time, TimeSet};
use crate::values::ValueSet2D;

use super::{Behavior, ComponentSpec, ItemSpec, StateId, StepOutcome};

/// The quantity every test behavior exchanges.
pub fn test_quantity() -> Quantity {
  Quantity::new(Unit::unity(), "signal", "scripted test signal")
}

fn window(start: f64, end: f64) -> TimeSet {
  let mut extent = TimeSet::new();
  extent.add_time(Time::stamp(start)).unwrap();
  extent.add_time(Time::stamp(end)).unwrap();
  extent
}

fn stamps(times: &[f64]) -> TimeSet {
  let mut set = TimeSet::new();
  for t in times {
    set.add_time(Time::stamp(*t)).unwrap();
  }
  set
}

/// Emits a scripted series on one output item named `out`.
///
/// The first series entry is published at the start time during preparation;
/// each step advances to the next entry. Snapshots capture the cursor, so
/// steps can be redone under iteration.
pub struct SourceBehavior {
  elements: ElementSet,
  series: Vec<(f64, Vec<f64>)>,
  cursor: usize,
  kept: HashMap<String, usize>,
  next_state: u64,
}

impl SourceBehavior {
  pub fn new(elements: ElementSet, series: Vec<(f64, Vec<f64>)>) -> Self {
    assert!(series.len() >= 2, "source series needs a start and an end entry");
    Self {
      elements,
      series,
      cursor: 0,
      kept: HashMap::new(),
      next_state: 0,
    }
  }
}

impl Behavior for SourceBehavior {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    let start = self.series.first().unwrap().0;
    let end = self.series.last().unwrap().0;
    Ok(ComponentSpec {
      caption: "scripted source".into(),
      description: String::new(),
      time_extent: window(start, end),
      outputs: vec![ItemSpec {
        id: "out".into(),
        quantity: test_quantity(),
        element_set: self.elements.clone(),
        time_set: TimeSet::new(),
      }],
      inputs: Vec::new(),
    })
  }

  fn initial_output_values(&mut self) -> Vec<(String, Vec<f64>)> {
    vec![("out".into(), self.series[0].1.clone())]
  }

  fn apply_input(&mut self, input_id: &str, _values: &ValueSet2D) -> Result<()> {
    Err(SimlinkError::ContractViolation(format!(
      "source has no input [{input_id}]"
    )))
  }

  fn perform_step(&mut self, _now: Time) -> Result<StepOutcome> {
    self.cursor += 1;
    let (stamp, values) = self.series.get(self.cursor).cloned().ok_or_else(|| {
      SimlinkError::Computation("scripted series exhausted".into())
    })?;
    Ok(StepOutcome {
      new_time: Time::stamp(stamp),
      output_values: vec![("out".into(), values)],
    })
  }

  fn keep_state(&mut self) -> Result<StateId> {
    let key = format!("state-{}", self.next_state);
    self.next_state += 1;
    self.kept.insert(key.clone(), self.cursor);
    Ok(StateId(key))
  }

  fn restore_state(&mut self, state: &StateId) -> Result<()> {
    self.cursor = *self.kept.get(&state.0).ok_or_else(|| {
      SimlinkError::ContractViolation(format!("unknown state [{}]", state.0))
    })?;
    Ok(())
  }

  fn clear_state(&mut self, state: &StateId) -> Result<()> {
    self.kept.remove(&state.0);
    Ok(())
  }
}

/// Receives values on one input item named `in` and records every applied
/// grid for inspection.
pub struct SinkBehavior {
  elements: ElementSet,
  request_times: Vec<f64>,
  start: f64,
  end: f64,
  dt: f64,
  now: f64,
  pub received: Arc<Mutex<Vec<ValueSet2D>>>,
}

impl SinkBehavior {
  pub fn new(elements: ElementSet, request_times: Vec<f64>, dt: f64) -> Self {
    let start = *request_times.first().expect("at least one request time");
    // The window must leave room for at least one step.
    let end = request_times.last().unwrap().max(start + dt);
    Self {
      elements,
      request_times,
      start,
      end,
      dt,
      now: start,
      received: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// Handle onto the applied input grids.
  pub fn received_handle(&self) -> Arc<Mutex<Vec<ValueSet2D>>> {
    Arc::clone(&self.received)
  }
}

impl Behavior for SinkBehavior {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    Ok(ComponentSpec {
      caption: "recording sink".into(),
      description: String::new(),
      time_extent: window(self.start, self.end),
      outputs: Vec::new(),
      inputs: vec![ItemSpec {
        id: "in".into(),
        quantity: test_quantity(),
        element_set: self.elements.clone(),
        time_set: stamps(&self.request_times),
      }],
    })
  }

  fn apply_input(&mut self, _input_id: &str, values: &ValueSet2D) -> Result<()> {
    self.received.lock().unwrap().push(values.clone());
    Ok(())
  }

  fn perform_step(&mut self, now: Time) -> Result<StepOutcome> {
    self.now = (now.timestamp() + self.dt).min(self.end);
    Ok(StepOutcome {
      new_time: Time::stamp(self.now),
      output_values: Vec::new(),
    })
  }
}

/// One half of a mutually coupled pair: publishes `gain * input + offset`
/// on `out`, reading `in` from the other half. Snapshot-capable, so the
/// iteration controller can redo its steps.
pub struct CoupledBehavior {
  elements: ElementSet,
  step_times: Vec<f64>,
  gain: f64,
  offset: f64,
  last_input: f64,
  value: f64,
  cursor: usize,
  kept: HashMap<String, (usize, f64)>,
  next_state: u64,
}

impl CoupledBehavior {
  pub fn new(elements: ElementSet, step_times: Vec<f64>, gain: f64, offset: f64) -> Self {
    assert!(step_times.len() >= 2);
    Self {
      elements,
      step_times,
      gain,
      offset,
      last_input: 0.0,
      value: 0.0,
      cursor: 0,
      kept: HashMap::new(),
      next_state: 0,
    }
  }
}

impl Behavior for CoupledBehavior {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    let start = self.step_times[0];
    let end = *self.step_times.last().unwrap();
    Ok(ComponentSpec {
      caption: "coupled half".into(),
      description: String::new(),
      time_extent: window(start, end),
      outputs: vec![ItemSpec {
        id: "out".into(),
        quantity: test_quantity(),
        element_set: self.elements.clone(),
        time_set: TimeSet::new(),
      }],
      inputs: vec![ItemSpec {
        id: "in".into(),
        quantity: test_quantity(),
        element_set: self.elements.clone(),
        time_set: stamps(&self.step_times[1..]),
      }],
    })
  }

  fn initial_output_values(&mut self) -> Vec<(String, Vec<f64>)> {
    vec![("out".into(), vec![self.value])]
  }

  fn apply_input(&mut self, _input_id: &str, values: &ValueSet2D) -> Result<()> {
    if values.time_count() > 0 {
      self.last_input = values.row_as_reals(0)?[0];
    }
    Ok(())
  }

  fn perform_step(&mut self, _now: Time) -> Result<StepOutcome> {
    self.cursor += 1;
    let stamp = *self.step_times.get(self.cursor).ok_or_else(|| {
      SimlinkError::Computation("coupled series exhausted".into())
    })?;
    self.value = self.gain * self.last_input + self.offset;
    Ok(StepOutcome {
      new_time: Time::stamp(stamp),
      output_values: vec![("out".into(), vec![self.value])],
    })
  }

  fn keep_state(&mut self) -> Result<StateId> {
    let key = format!("state-{}", self.next_state);
    self.next_state += 1;
    self.kept.insert(key.clone(), (self.cursor, self.value));
    Ok(StateId(key))
  }

  fn restore_state(&mut self, state: &StateId) -> Result<()> {
    let (cursor, value) = *self.kept.get(&state.0).ok_or_else(|| {
      SimlinkError::ContractViolation(format!("unknown state [{}]", state.0))
    })?;
    self.cursor = cursor;
    self.value = value;
    Ok(())
  }

  fn clear_state(&mut self, state: &StateId) -> Result<()> {
    self.kept.remove(&state.0);
    Ok(())
  }
}

/// A behavior whose step always fails; used for failure-path tests.
pub struct FailingBehavior {
  elements: ElementSet,
}

impl FailingBehavior {
  pub fn new(elements: ElementSet) -> Self {
    Self { elements }
  }
}

impl Behavior for FailingBehavior {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    Ok(ComponentSpec {
      caption: "always failing".into(),
      description: String::new(),
      time_extent: window(0.0, 10.0),
      outputs: vec![ItemSpec {
        id: "out".into(),
        quantity: test_quantity(),
        element_set: self.elements.clone(),
        time_set: TimeSet::new(),
      }],
      inputs: Vec::new(),
    })
  }

  fn apply_input(&mut self, _input_id: &str, _values: &ValueSet2D) -> Result<()> {
    Ok(())
  }

  fn perform_step(&mut self, _now: Time) -> Result<StepOutcome> {
    Err(SimlinkError::Computation("deliberate failure".into()))
  }
}
