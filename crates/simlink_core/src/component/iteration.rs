//! Fixed-point iteration over mutually coupled components.
//!
//! Components joined by a "loop" link cannot be resolved by the acyclic pull
//! recursion; the controller hosts them instead and drives every member to a
//! joint fixed point per time step. Each sweep snapshots member states, steps
//! every member once, measures how much the freshly produced output rows
//! moved since the previous sweep, and either accepts the step or rolls all
//! members back and sweeps again.
//!
//! The controller itself follows the component lifecycle so a driver can
//! treat it like any other component. Its fixed-point policy is
//! configuration, not hard-wired: `max_iter`, `eps` and `relaxation`.

use tracing::debug;

use crate::error::{Result, SimlinkError};
use crate::exchange::ComponentId;
use crate::time::{Time, EPSILON_DAYS};

use super::graph::{ComponentSnapshot, LinkGraph};
use super::Status;

/// Fixed-point policy knobs.
#[derive(Clone, Copy, Debug)]
pub struct IterationConfig {
  /// Sweeps after which the step is accepted regardless of convergence.
  pub max_iter: usize,
  /// Largest acceptable change of any output value between two sweeps.
  pub eps: f64,
  /// Under-relaxation applied to the convergence measure; 0 compares raw
  /// sweeps, values toward 1 damp the measured change.
  pub relaxation: f64,
}

impl Default for IterationConfig {
  fn default() -> Self {
    Self {
      max_iter: 20,
      eps: 1e-6,
      relaxation: 0.0,
    }
  }
}

/// Drives a set of member components to a joint fixed point per step.
#[derive(Debug)]
pub struct IterationController {
  pub id: String,
  members: Vec<ComponentId>,
  config: IterationConfig,
  status: Status,
  current_time: Option<Time>,
}

impl IterationController {
  pub fn new(id: impl Into<String>, members: Vec<ComponentId>, config: IterationConfig) -> Self {
    Self {
      id: id.into(),
      members,
      config,
      status: Status::Created,
      current_time: None,
    }
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn current_time(&self) -> Option<Time> {
    self.current_time
  }

  pub fn members(&self) -> &[ComponentId] {
    &self.members
  }

  fn set_status(&mut self, next: Status) -> Result<()> {
    if self.status == next {
      return Ok(());
    }
    if !self.status.can_transition_to(next) {
      return Err(SimlinkError::ContractViolation(format!(
        "illegal status transition {:?} -> {next:?} for iteration controller [{}]",
        self.status, self.id
      )));
    }
    self.status = next;
    Ok(())
  }

  /// Adopt the members: their cascading input retirement is disabled so a
  /// time step can be redone, and the controller clock starts at the
  /// earliest member clock.
  pub fn initialize(&mut self, graph: &mut LinkGraph) -> Result<()> {
    self.set_status(Status::Initializing)?;

    if self.members.is_empty() {
      return Err(SimlinkError::Config(format!(
        "iteration controller [{}] has no member components",
        self.id
      )));
    }

    for &member in &self.members {
      graph.set_retirement_disabled(member, true);
    }
    self.current_time = self.earliest_member_time(graph);

    self.set_status(Status::Initialized)
  }

  /// Validate the policy and that every member can snapshot its state.
  pub fn validate(&mut self, graph: &mut LinkGraph) -> Result<Vec<String>> {
    self.set_status(Status::Validating)?;

    let mut errors = Vec::new();
    if self.config.max_iter < 1 {
      errors.push(format!("iteration controller [{}]: max_iter must be at least 1", self.id));
    }
    if self.config.eps < 0.0 {
      errors.push(format!("iteration controller [{}]: eps must not be negative", self.id));
    }
    if !(0.0..=1.0).contains(&self.config.relaxation) {
      errors.push(format!(
        "iteration controller [{}]: relaxation must be in [0, 1]",
        self.id
      ));
    }

    for &member in &self.members {
      match graph.keep_component_state(member) {
        Ok(snapshot) => graph.drop_component_state(member, &snapshot),
        Err(_) => errors.push(format!(
          "member [{}] cannot snapshot its state for iteration",
          graph.component(member).id
        )),
      }
    }

    self.set_status(if errors.is_empty() { Status::Valid } else { Status::Invalid })?;
    Ok(errors)
  }

  pub fn prepare(&mut self) -> Result<()> {
    self.set_status(Status::Preparing)?;
    self.set_status(Status::Updated)
  }

  /// Advance every member one jointly converged time step.
  pub fn update(&mut self, graph: &mut LinkGraph) -> Result<()> {
    if self.status.is_terminal() {
      return Ok(());
    }
    self.set_status(Status::WaitingForData)?;
    self.set_status(Status::Updating)?;

    let mut previous: Option<Vec<f64>> = None;
    let mut sweep = 0;

    loop {
      let snapshots: Vec<(ComponentId, ComponentSnapshot)> = self
        .members
        .iter()
        .map(|&member| Ok((member, graph.keep_component_state(member)?)))
        .collect::<Result<_>>()?;

      // A member may already have been stepped through another member's
      // pull; only members still at the sweep's start time step explicitly.
      let target = self
        .current_time
        .map(|t| t.timestamp())
        .unwrap_or(f64::NEG_INFINITY);
      for &member in &self.members {
        let at = graph
          .component(member)
          .current_time
          .map(|t| t.timestamp())
          .unwrap_or(f64::NEG_INFINITY);
        if at <= target + EPSILON_DAYS {
          graph.update(member)?;
        }
      }

      let current = self.collect_output_rows(graph)?;
      let converged = match &previous {
        None => false,
        Some(previous) => {
          let change = previous
            .iter()
            .zip(&current)
            .map(|(a, b)| (a - b).abs() * (1.0 - self.config.relaxation))
            .fold(0.0, f64::max);
          change <= self.config.eps
        }
      };

      sweep += 1;
      if converged || sweep >= self.config.max_iter {
        for (member, snapshot) in &snapshots {
          graph.drop_component_state(*member, snapshot);
        }
        debug!(controller = %self.id, sweep, converged, "iteration step accepted");
        break;
      }

      // Not converged: roll everything back and sweep again.
      for (member, snapshot) in &snapshots {
        graph.restore_component_state(*member, snapshot)?;
      }
      previous = Some(current);
    }

    self.current_time = self.earliest_member_time(graph);

    let all_done = self
      .members
      .iter()
      .all(|&member| graph.component(member).status == Status::Done);
    self.set_status(if all_done { Status::Done } else { Status::Updated })
  }

  pub fn finish(&mut self, graph: &mut LinkGraph) -> Result<()> {
    self.set_status(Status::Finishing)?;
    for &member in &self.members {
      let status = graph.component(member).status;
      if matches!(status, Status::Updated | Status::Done | Status::Failed) {
        graph.finish(member)?;
      }
    }
    self.set_status(Status::Finished)
  }

  /// Concatenation of the latest row of every member output, the measure
  /// convergence is judged on.
  fn collect_output_rows(&self, graph: &LinkGraph) -> Result<Vec<f64>> {
    let mut collected = Vec::new();
    for &member in &self.members {
      for &oid in &graph.component(member).outputs {
        let values = &graph.output(oid).item.values;
        if values.time_count() > 0 {
          collected.extend(values.row_as_reals(values.time_count() - 1)?);
        }
      }
    }
    Ok(collected)
  }

  fn earliest_member_time(&self, graph: &LinkGraph) -> Option<Time> {
    self
      .members
      .iter()
      .filter_map(|&member| graph.component(member).current_time)
      .min_by(|a, b| a.timestamp().total_cmp(&b.timestamp()))
  }
}

#[cfg(test)]
#[path = "iteration_test.rs"]
mod iteration_test;
