//! The link graph and its pull engine.
//!
//! All components, inputs, outputs and adapted outputs live in indexed
//! arenas owned by one [`LinkGraph`]. Consumer/provider edges are ids (weak
//! references, validated on access); an output's adapted outputs are owned
//! children. The pull engine walks providers on demand: when a pull reaches
//! a producer whose time horizon does not yet cover the request, the
//! producer's component is stepped forward, and intermediate rows that no
//! consumer can ever request again are dropped.

use tracing::{debug, trace, warn};

use crate::error::{Result, SimlinkError};
use crate::element::ElementSet;
use crate::exchange::compat::{check_element_sets, check_quantities, check_time_sets};
use crate::exchange::{
  AdaptedOutput, AdaptorId, AdaptorKind, ComponentId, ExchangeItem, InputId, InputItem, OutputId,
  OutputItem, ProviderRef,
};
use crate::mapper::MapMethod;
use crate::quantity::Quantity;
use crate::time::{Time, TimeSet, EPSILON_DAYS};
use crate::values::{ScalarKind, ValueSet2D};

use super::{Behavior, ComponentState, Event, EventBus, StateId, Status};

/// Snapshot of a component taken before a redoable time step.
#[derive(Clone, Debug)]
pub struct ComponentSnapshot {
  pub(crate) state: StateId,
  status: Status,
  current_time: Option<Time>,
}

/// Arena of components and exchange items plus the pull engine over them.
#[derive(Default)]
pub struct LinkGraph {
  components: Vec<ComponentState>,
  outputs: Vec<OutputItem>,
  inputs: Vec<InputItem>,
  adaptors: Vec<AdaptedOutput>,
  events: EventBus,
}

impl LinkGraph {
  pub fn new() -> Self {
    Self::default()
  }

  // Arena access -----------------------------------------------------------

  pub fn add_component(&mut self, id: impl Into<String>, behavior: Box<dyn Behavior>) -> ComponentId {
    self.components.push(ComponentState::new(id, behavior));
    ComponentId(self.components.len() - 1)
  }

  pub fn component(&self, cid: ComponentId) -> &ComponentState {
    &self.components[cid.0]
  }

  pub fn component_count(&self) -> usize {
    self.components.len()
  }

  pub fn component_ids(&self) -> Vec<ComponentId> {
    (0..self.components.len()).map(ComponentId).collect()
  }

  pub fn output(&self, oid: OutputId) -> &OutputItem {
    &self.outputs[oid.0]
  }

  pub fn input(&self, iid: InputId) -> &InputItem {
    &self.inputs[iid.0]
  }

  pub fn adaptor(&self, aid: AdaptorId) -> &AdaptedOutput {
    &self.adaptors[aid.0]
  }

  /// Subscribe to status-change and item-change events.
  pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<Event> {
    self.events.subscribe()
  }

  /// Find a component's output item by its item id.
  pub fn find_output(&self, cid: ComponentId, item_id: &str) -> Option<OutputId> {
    self.components[cid.0]
      .outputs
      .iter()
      .copied()
      .find(|oid| self.outputs[oid.0].item.id == item_id)
  }

  /// Find a component's input item by its item id.
  pub fn find_input(&self, cid: ComponentId, item_id: &str) -> Option<InputId> {
    self.components[cid.0]
      .inputs
      .iter()
      .copied()
      .find(|iid| self.inputs[iid.0].item.id == item_id)
  }

  // Lifecycle --------------------------------------------------------------

  fn set_status(&mut self, cid: ComponentId, next: Status) -> Result<()> {
    let current = self.components[cid.0].status;
    if current == next {
      return Ok(());
    }
    if !current.can_transition_to(next) {
      return Err(SimlinkError::ContractViolation(format!(
        "illegal status transition {current:?} -> {next:?} for component [{}]",
        self.components[cid.0].id
      )));
    }

    self.components[cid.0].status = next;
    trace!(component = %self.components[cid.0].id, ?current, ?next, "status change");
    self.events.broadcast(Event::StatusChanged {
      component: self.components[cid.0].id.clone(),
      old: current,
      new: next,
    });
    Ok(())
  }

  /// Initialize: the behavior declares its items and simulation window, the
  /// graph creates the exchange-item slots.
  pub fn initialize(&mut self, cid: ComponentId) -> Result<()> {
    self.set_status(cid, Status::Initializing)?;

    let spec = self.components[cid.0].behavior.on_initialize()?;
    self.components[cid.0].caption = spec.caption;
    self.components[cid.0].description = spec.description;
    self.components[cid.0].current_time = spec.time_extent.horizon().map(|h| Time::stamp(h.timestamp()));
    self.components[cid.0].time_extent = spec.time_extent;

    for item in spec.outputs {
      let exchange = ExchangeItem::new(item.id, item.quantity, item.element_set, item.time_set, cid);
      self.outputs.push(OutputItem::new(exchange));
      let oid = OutputId(self.outputs.len() - 1);
      self.components[cid.0].outputs.push(oid);
    }

    for item in spec.inputs {
      let exchange = ExchangeItem::new(item.id, item.quantity, item.element_set, item.time_set, cid);
      self.inputs.push(InputItem::new(exchange));
      let iid = InputId(self.inputs.len() - 1);
      self.components[cid.0].inputs.push(iid);
    }

    self.set_status(cid, Status::Initialized)
  }

  /// Validate: collect diagnostics; an empty list marks the component Valid.
  pub fn validate(&mut self, cid: ComponentId) -> Result<Vec<String>> {
    self.set_status(cid, Status::Validating)?;

    let mut errors = Vec::new();
    if self.components[cid.0].time_extent.horizon().is_none() {
      errors.push(format!(
        "component [{}] has no simulation window",
        self.components[cid.0].id
      ));
    }
    errors.extend(self.components[cid.0].behavior.on_validate());

    if errors.is_empty() {
      self.set_status(cid, Status::Valid)?;
    } else {
      warn!(component = %self.components[cid.0].id, ?errors, "component invalid");
      self.set_status(cid, Status::Invalid)?;
    }
    Ok(errors)
  }

  /// Prepare for the run: the behavior may publish initial output rows at
  /// the start time. Leaves the component Updated and pullable.
  pub fn prepare(&mut self, cid: ComponentId) -> Result<()> {
    self.set_status(cid, Status::Preparing)?;
    self.components[cid.0].behavior.on_prepare()?;

    let start = self.components[cid.0].current_time;
    let initial = self.components[cid.0].behavior.initial_output_values();
    if let Some(start) = start {
      for (item_id, values) in initial {
        let oid = self.find_output(cid, &item_id).ok_or_else(|| {
          SimlinkError::ContractViolation(format!(
            "behavior produced initial values for unknown output [{item_id}]"
          ))
        })?;
        self.outputs[oid.0].item.time_set.add_time(start)?;
        self.outputs[oid.0].item.values.push_real_row(&values)?;
      }
    }

    self.set_status(cid, Status::Updated)
  }

  /// Finish: drop all strong edges to the component's items; the weak edges
  /// held elsewhere become stale and are skipped during pulls.
  pub fn finish(&mut self, cid: ComponentId) -> Result<()> {
    self.set_status(cid, Status::Finishing)?;
    self.components[cid.0].behavior.on_finish();
    self.clear_items(cid);
    self.set_status(cid, Status::Finished)
  }

  /// Finish back to Created; the component can be initialized again.
  pub fn reset(&mut self, cid: ComponentId) -> Result<()> {
    self.set_status(cid, Status::Finishing)?;
    self.components[cid.0].behavior.on_finish();
    self.clear_items(cid);
    self.components[cid.0].time_extent.clear();
    self.components[cid.0].current_time = None;
    self.components[cid.0].inputs.clear();
    self.components[cid.0].outputs.clear();
    self.set_status(cid, Status::Created)
  }

  fn clear_items(&mut self, cid: ComponentId) {
    for oid in self.components[cid.0].outputs.clone() {
      for aid in self.outputs[oid.0].adaptors.clone() {
        self.clear_adaptor(aid);
      }
      let output = &mut self.outputs[oid.0];
      output.alive = false;
      output.consumers.clear();
      output.adaptors.clear();
      output.item.values.clear();
      output.item.time_set.clear();
    }
    for iid in self.components[cid.0].inputs.clone() {
      let input = &mut self.inputs[iid.0];
      input.alive = false;
      input.providers.clear();
      input.item.values.clear();
    }
  }

  fn clear_adaptor(&mut self, aid: AdaptorId) {
    for chained in self.adaptors[aid.0].adaptors.clone() {
      self.clear_adaptor(chained);
    }
    let adaptor = &mut self.adaptors[aid.0];
    adaptor.alive = false;
    adaptor.consumers.clear();
    adaptor.adaptors.clear();
  }

  // Connections ------------------------------------------------------------

  /// Connect an output to a consumer input.
  ///
  /// Runs the three compatibility checks in order (quantity, time set,
  /// element set) and registers the reciprocal provider edge. Failure leaves
  /// both sides untouched.
  pub fn connect(&mut self, oid: OutputId, iid: InputId) -> Result<()> {
    if !self.outputs[oid.0].alive || !self.inputs[iid.0].alive {
      return Err(SimlinkError::ContractViolation(
        "cannot connect finished exchange items".into(),
      ));
    }
    if self.outputs[oid.0].consumers.contains(&iid) {
      return Ok(());
    }

    let output = &self.outputs[oid.0].item;
    let input = &self.inputs[iid.0].item;
    check_quantities(&output.quantity, &input.quantity)?;
    check_time_sets(&output.time_set, &input.time_set)?;
    check_element_sets(&output.element_set, &input.element_set)?;

    self.outputs[oid.0].consumers.push(iid);
    self.inputs[iid.0].providers.push(ProviderRef::Output(oid));
    debug!(
      output = %self.outputs[oid.0].item.id,
      input = %self.inputs[iid.0].item.id,
      "connected"
    );
    Ok(())
  }

  /// Remove a consumer edge and its reciprocal provider edge.
  pub fn disconnect(&mut self, oid: OutputId, iid: InputId) {
    self.outputs[oid.0].consumers.retain(|c| *c != iid);
    self.inputs[iid.0]
      .providers
      .retain(|p| *p != ProviderRef::Output(oid));
  }

  /// Connect an adapted output to a consumer input.
  ///
  /// Only the element-set check runs against the adaptor's exposed set (and
  /// the time-set check for non-time adaptors); value definitions are not
  /// rechecked because the adaptor may have rewritten them.
  pub fn connect_adapted(&mut self, aid: AdaptorId, iid: InputId) -> Result<()> {
    if !self.adaptors[aid.0].alive || !self.inputs[iid.0].alive {
      return Err(SimlinkError::ContractViolation(
        "cannot connect finished exchange items".into(),
      ));
    }
    if self.adaptors[aid.0].consumers.contains(&iid) {
      return Ok(());
    }

    if !matches!(self.adaptors[aid.0].kind, AdaptorKind::Time { .. }) {
      let provider_times = self.provider_times(ProviderRef::Adapted(aid))?;
      check_time_sets(&provider_times, &self.inputs[iid.0].item.time_set)?;
    }
    check_element_sets(&self.adaptors[aid.0].element_set, &self.inputs[iid.0].item.element_set)?;

    self.adaptors[aid.0].consumers.push(iid);
    self.inputs[iid.0].providers.push(ProviderRef::Adapted(aid));
    Ok(())
  }

  pub fn disconnect_adapted(&mut self, aid: AdaptorId, iid: InputId) {
    self.adaptors[aid.0].consumers.retain(|c| *c != iid);
    self.inputs[iid.0]
      .providers
      .retain(|p| *p != ProviderRef::Adapted(aid));
  }

  // Adaptor construction ---------------------------------------------------

  fn push_adaptor(&mut self, parent: ProviderRef, adaptor: AdaptedOutput) -> AdaptorId {
    self.adaptors.push(adaptor);
    let aid = AdaptorId(self.adaptors.len() - 1);
    match parent {
      ProviderRef::Output(oid) => self.outputs[oid.0].adaptors.push(aid),
      ProviderRef::Adapted(parent_aid) => self.adaptors[parent_aid.0].adaptors.push(aid),
    }
    aid
  }

  /// Attach an area-scaling adaptor to a polygon provider.
  pub fn add_area_adaptor(
    &mut self,
    parent: ProviderRef,
    id: impl Into<String>,
    exponent: f64,
  ) -> Result<AdaptorId> {
    let quantity = self.provider_quantity(parent)?;
    let elements = self.provider_elements(parent)?;
    let component = self.provider_component(parent)?;
    let adaptor = AdaptedOutput::area(id, exponent, parent, component, &quantity, &elements)?;
    Ok(self.push_adaptor(parent, adaptor))
  }

  /// Attach a length-scaling adaptor to a polyline provider.
  pub fn add_length_adaptor(
    &mut self,
    parent: ProviderRef,
    id: impl Into<String>,
    exponent: f64,
  ) -> Result<AdaptorId> {
    let quantity = self.provider_quantity(parent)?;
    let elements = self.provider_elements(parent)?;
    let component = self.provider_component(parent)?;
    let adaptor = AdaptedOutput::length(id, exponent, parent, component, &quantity, &elements)?;
    Ok(self.push_adaptor(parent, adaptor))
  }

  /// Attach a spatial mapping adaptor translating onto `target`.
  pub fn add_space_map_adaptor(
    &mut self,
    parent: ProviderRef,
    id: impl Into<String>,
    method: MapMethod,
    target: ElementSet,
  ) -> Result<AdaptorId> {
    let quantity = self.provider_quantity(parent)?;
    let elements = self.provider_elements(parent)?;
    let component = self.provider_component(parent)?;
    let adaptor =
      AdaptedOutput::space_map(id, method, parent, component, &quantity, &elements, target)?;
    Ok(self.push_adaptor(parent, adaptor))
  }

  /// Attach a buffering time adaptor.
  pub fn add_time_adaptor(&mut self, parent: ProviderRef, id: impl Into<String>) -> Result<AdaptorId> {
    let quantity = self.provider_quantity(parent)?;
    let elements = self.provider_elements(parent)?;
    let component = self.provider_component(parent)?;
    let adaptor = AdaptedOutput::time(id, parent, component, &quantity, &elements);
    Ok(self.push_adaptor(parent, adaptor))
  }

  // Provider helpers -------------------------------------------------------

  pub fn provider_alive(&self, provider: ProviderRef) -> bool {
    match provider {
      ProviderRef::Output(oid) => self.outputs[oid.0].alive,
      ProviderRef::Adapted(aid) => self.adaptors[aid.0].alive,
    }
  }

  pub fn provider_component(&self, provider: ProviderRef) -> Result<ComponentId> {
    match provider {
      ProviderRef::Output(oid) => Ok(self.outputs[oid.0].item.component),
      ProviderRef::Adapted(aid) => Ok(self.adaptors[aid.0].component),
    }
  }

  pub fn provider_quantity(&self, provider: ProviderRef) -> Result<Quantity> {
    match provider {
      ProviderRef::Output(oid) => Ok(self.outputs[oid.0].item.quantity.clone()),
      ProviderRef::Adapted(aid) => Ok(self.adaptors[aid.0].quantity.clone()),
    }
  }

  pub fn provider_elements(&self, provider: ProviderRef) -> Result<ElementSet> {
    match provider {
      ProviderRef::Output(oid) => Ok(self.outputs[oid.0].item.element_set.clone()),
      ProviderRef::Adapted(aid) => Ok(self.adaptors[aid.0].element_set.clone()),
    }
  }

  /// The time structure a provider currently answers with. Time adaptors
  /// answer from their buffer; space adaptors pass their adaptee's through.
  pub fn provider_times(&self, provider: ProviderRef) -> Result<TimeSet> {
    match provider {
      ProviderRef::Output(oid) => Ok(self.outputs[oid.0].item.time_set.clone()),
      ProviderRef::Adapted(aid) => match &self.adaptors[aid.0].kind {
        AdaptorKind::Time { buffer } => Ok(buffer.times().clone()),
        _ => self.provider_times(self.adaptors[aid.0].adaptee),
      },
    }
  }

  /// All inputs whose requests reach this output: its direct consumers plus
  /// the consumers of every space adaptor chained onto it. Time adaptors are
  /// excluded; they buffer on their own and step the component themselves.
  fn gather_output_consumers(&self, oid: OutputId) -> Vec<InputId> {
    let mut consumers = self.outputs[oid.0].consumers.clone();
    let mut stack = self.outputs[oid.0].adaptors.clone();
    while let Some(aid) = stack.pop() {
      let adaptor = &self.adaptors[aid.0];
      if !adaptor.alive || matches!(adaptor.kind, AdaptorKind::Time { .. }) {
        continue;
      }
      consumers.extend(adaptor.consumers.iter().copied());
      stack.extend(adaptor.adaptors.iter().copied());
    }
    consumers
  }

  /// Earliest time any of the given consumers may still request.
  fn earliest_consumer_time(&self, consumers: &[InputId]) -> Option<f64> {
    consumers
      .iter()
      .filter(|iid| self.inputs[iid.0].alive)
      .filter_map(|iid| self.inputs[iid.0].item.time_set.times().first().copied())
      .map(|t| t.timestamp())
      .min_by(f64::total_cmp)
  }

  /// Latest time any of the given consumers requires.
  fn latest_consumer_time(&self, consumers: &[InputId]) -> Option<f64> {
    consumers
      .iter()
      .filter(|iid| self.inputs[iid.0].alive)
      .map(|iid| self.inputs[iid.0].item.time_set.horizon_end())
      .filter(|end| end.is_finite())
      .max_by(f64::total_cmp)
  }

  // Update contract --------------------------------------------------------

  /// Step a component per the update contract.
  ///
  /// Terminal states are a no-op. A component already mid-update provides
  /// current values (late consumers read estimates from adaptor buffers).
  /// Otherwise inputs are pulled (recursing into providers), the behavior
  /// advances one time step, outputs are refreshed and expired input rows
  /// are retired.
  pub fn update(&mut self, cid: ComponentId) -> Result<()> {
    let status = self.components[cid.0].status;
    if status.is_terminal() {
      return Ok(());
    }
    if matches!(status, Status::Updating | Status::WaitingForData) {
      self.refresh_component_adaptors(cid)?;
      return Ok(());
    }

    // A Valid component pulled before its driver prepared it runs through
    // Preparing first; WaitingForData is only reachable from Updated.
    if self.components[cid.0].status == Status::Valid {
      self.prepare(cid)?;
    }

    self.set_status(cid, Status::WaitingForData)?;

    // Pull all connected inputs and hand them to the behavior.
    for iid in self.components[cid.0].inputs.clone() {
      if self.inputs[iid.0].providers.is_empty() {
        continue;
      }
      let values = self.pull_input(iid)?;
      let item_id = self.inputs[iid.0].item.id.clone();
      self.components[cid.0].behavior.apply_input(&item_id, &values)?;
    }

    self.set_status(cid, Status::Updating)?;

    let now = self.components[cid.0].current_time.ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "component [{}] updated without a current time",
        self.components[cid.0].id
      ))
    })?;

    let outcome = match self.components[cid.0].behavior.perform_step(now) {
      Ok(outcome) => outcome,
      Err(err) => {
        let id = self.components[cid.0].id.clone();
        warn!(component = %id, %err, "time step failed");
        self.set_status(cid, Status::Failed)?;
        self.finish(cid)?;
        return Err(SimlinkError::Computation(format!(
          "component [{id}] failed to advance: {err}"
        )));
      }
    };

    // The step must advance the clock, or the pull recursion cannot
    // terminate.
    if outcome.new_time.timestamp() <= now.timestamp() + EPSILON_DAYS {
      return Err(SimlinkError::Computation(format!(
        "component [{}] did not advance its clock",
        self.components[cid.0].id
      )));
    }

    // Refresh the output items with the new row. A redone step (under
    // iterative coupling) overwrites the row it produced last sweep.
    for (item_id, values) in &outcome.output_values {
      let oid = self.find_output(cid, item_id).ok_or_else(|| {
        SimlinkError::ContractViolation(format!(
          "behavior produced values for unknown output [{item_id}]"
        ))
      })?;

      let output = &mut self.outputs[oid.0];
      let existing = output
        .item
        .time_set
        .times()
        .iter()
        .position(|t| t.same_stamp(&outcome.new_time));
      match existing {
        Some(row) => {
          for (e, value) in values.iter().enumerate() {
            output.item.values.set_value(row, e, (*value).into())?;
          }
        }
        None => {
          output.item.time_set.add_time(outcome.new_time)?;
          output.item.values.push_real_row(values)?;
        }
      }

      self.events.broadcast(Event::ItemChanged {
        item: item_id.clone(),
        message: "values refreshed".into(),
      });
    }

    self.components[cid.0].current_time = Some(outcome.new_time);
    self.refresh_component_adaptors(cid)?;

    if !self.components[cid.0].retirement_disabled {
      self.retire_inputs(cid, outcome.new_time)?;
    }

    let end = self.components[cid.0]
      .end_time()
      .map(|t| t.timestamp())
      .unwrap_or(f64::INFINITY);
    let next = if outcome.new_time.timestamp() >= end {
      Status::Done
    } else {
      Status::Updated
    };
    self.set_status(cid, next)
  }

  /// Drop input rows strictly older than the new current time. An input
  /// drained empty re-arms with one row of missing values at `now`.
  fn retire_inputs(&mut self, cid: ComponentId, now: Time) -> Result<()> {
    for iid in self.components[cid.0].inputs.clone() {
      if self.inputs[iid.0].providers.is_empty() {
        continue;
      }

      let input = &mut self.inputs[iid.0];
      while let Some(first) = input.item.time_set.times().first().copied() {
        if first.timestamp() < now.timestamp() {
          input.item.time_set.remove_time(0)?;
          if input.item.values.time_count() > 0 {
            input.item.values.remove_row(0)?;
          }
        } else {
          break;
        }
      }

      if input.item.time_set.is_empty() {
        let elements = input.item.element_set.element_count();
        let missing = input.item.quantity.missing_data_value;
        input.item.time_set.add_time(now)?;
        input.item.values.clear();
        input.item.values.push_real_row(&vec![missing; elements])?;
      }
    }
    Ok(())
  }

  /// Drive every prepared component until all are Done.
  pub fn run(&mut self) -> Result<()> {
    loop {
      let mut pending = Vec::new();
      for cid in self.component_ids() {
        match self.components[cid.0].status {
          Status::Updated => pending.push(cid),
          Status::Done | Status::Finished | Status::Failed => {}
          other => {
            return Err(SimlinkError::ContractViolation(format!(
              "component [{}] in status {other:?} cannot be run",
              self.components[cid.0].id
            )));
          }
        }
      }

      if pending.is_empty() {
        return Ok(());
      }
      for cid in pending {
        self.update(cid)?;
      }
    }
  }

  // Pull engine ------------------------------------------------------------

  /// An output's `getValues`: advance the producer as far as the latest
  /// consumer requires, refresh adaptors, retire rows before the earliest
  /// consumer time, and hand out the value set.
  pub fn pull_output(&mut self, oid: OutputId) -> Result<ValueSet2D> {
    if !self.outputs[oid.0].alive {
      return Err(SimlinkError::ContractViolation(
        "pull on a finished output".into(),
      ));
    }

    let consumers = self.gather_output_consumers(oid);
    if let Some(latest) = self.latest_consumer_time(&consumers) {
      loop {
        let cid = self.outputs[oid.0].item.component;
        let available = self.outputs[oid.0].item.time_set.horizon_end();
        if self.components[cid.0].status != Status::Updated || available >= latest {
          break;
        }

        self.update(cid)?;

        let after = self.outputs[oid.0].item.time_set.horizon_end();
        if after <= available && self.components[cid.0].status == Status::Updated {
          return Err(SimlinkError::Computation(format!(
            "component [{}] stalled while updating output [{}]",
            self.components[cid.0].id, self.outputs[oid.0].item.id
          )));
        }
      }
    }

    self.refresh_output_adaptors(oid)?;

    let earliest = self.earliest_consumer_time(&consumers);
    self.retire_output_rows(oid, earliest)?;

    Ok(self.outputs[oid.0].item.values.clone())
  }

  /// Drop output rows no consumer can request again: everything strictly
  /// before the earliest consumer time, or before the last row if the
  /// output has no direct consumers.
  fn retire_output_rows(&mut self, oid: OutputId, earliest: Option<f64>) -> Result<()> {
    let output = &mut self.outputs[oid.0];
    let cutoff = match earliest {
      Some(t) => t,
      None => match output.item.time_set.times().last() {
        Some(last) => last.timestamp(),
        None => return Ok(()),
      },
    };

    while let Some(first) = output.item.time_set.times().first().copied() {
      if first.timestamp() < cutoff {
        output.item.time_set.remove_time(0)?;
        if output.item.values.time_count() > 0 {
          output.item.values.remove_row(0)?;
        }
      } else {
        break;
      }
    }
    Ok(())
  }

  /// An input's `getValues`: pull every live provider and sum componentwise
  /// into the input's own time-by-element grid, skipping missing-data
  /// sentinels.
  ///
  /// With request times set, provider rows are matched to them by stamp; a
  /// request without times takes the providers' rows as they come.
  pub fn pull_input(&mut self, iid: InputId) -> Result<ValueSet2D> {
    let request = self.inputs[iid.0].item.time_set.clone();

    let mut pulled = Vec::new();
    for provider in self.inputs[iid.0].providers.clone() {
      if !self.provider_alive(provider) {
        // Stale weak edge discovered during pull.
        continue;
      }
      let values = self.pull_provider(provider, &request)?;
      if values.time_count() == 0 {
        continue;
      }
      let times = match provider {
        // Time adaptors answer exactly for the requested times.
        ProviderRef::Adapted(aid)
          if matches!(self.adaptors[aid.0].kind, AdaptorKind::Time { .. }) =>
        {
          request.times().to_vec()
        }
        _ => self.provider_times(provider)?.times().to_vec(),
      };
      let missing = values
        .quantity()
        .map(|q| q.missing_data_value)
        .unwrap_or(self.inputs[iid.0].item.quantity.missing_data_value);
      pulled.push((values, times, missing));
    }

    let elements = self.inputs[iid.0].item.element_set.element_count();
    let mut grid = ValueSet2D::new(ScalarKind::Real, Some(self.inputs[iid.0].item.quantity.clone()));

    if request.is_empty() {
      // No declared request times: accept the providers' rows by index.
      let times = pulled.iter().map(|(v, _, _)| v.time_count()).max().unwrap_or(0);
      for t in 0..times {
        let mut row = vec![0.0; elements];
        for (values, _, missing) in &pulled {
          if t >= values.time_count() {
            continue;
          }
          accumulate_row(&mut row, values, t, *missing)?;
        }
        grid.push_real_row(&row)?;
      }
    } else {
      for requested in request.times() {
        let mut row = vec![0.0; elements];
        for (values, times, missing) in &pulled {
          let slot = times
            .iter()
            .take(values.time_count())
            .position(|t| t.same_stamp(requested));
          if let Some(t) = slot {
            accumulate_row(&mut row, values, t, *missing)?;
          }
        }
        grid.push_real_row(&row)?;
      }
    }

    self.inputs[iid.0].item.values = grid.clone();
    Ok(grid)
  }

  /// Pull any provider for the requesting time set.
  pub fn pull_provider(&mut self, provider: ProviderRef, request: &TimeSet) -> Result<ValueSet2D> {
    match provider {
      ProviderRef::Output(oid) => self.pull_output(oid),
      ProviderRef::Adapted(aid) => self.pull_adaptor(aid, request),
    }
  }

  /// Pull an adapted output; space adaptors transform their adaptee's
  /// values, the time adaptor answers each requested time from its buffer.
  pub fn pull_adaptor(&mut self, aid: AdaptorId, request: &TimeSet) -> Result<ValueSet2D> {
    if !self.adaptors[aid.0].alive {
      return Err(SimlinkError::ContractViolation(
        "pull on a finished adapted output".into(),
      ));
    }

    if matches!(self.adaptors[aid.0].kind, AdaptorKind::Time { .. }) {
      return self.pull_time_adaptor(aid, request);
    }

    let adaptee = self.adaptors[aid.0].adaptee;
    let inner = self.pull_provider(adaptee, request)?;

    let adaptor = &self.adaptors[aid.0];
    let mut out = match &adaptor.kind {
      AdaptorKind::Area { factors, .. } | AdaptorKind::Length { factors, .. } => {
        let mut scaled = ValueSet2D::new(ScalarKind::Real, None);
        for t in 0..inner.time_count() {
          let row: Vec<f64> = inner
            .row_as_reals(t)?
            .iter()
            .zip(factors)
            .map(|(v, f)| v * f)
            .collect();
          scaled.push_real_row(&row)?;
        }
        scaled
      }
      AdaptorKind::SpaceMap { mapper } => mapper.map_values(&inner)?,
      AdaptorKind::Time { .. } => unreachable!(),
    };

    out.set_quantity(Some(adaptor.quantity.clone()));
    Ok(out)
  }

  fn pull_time_adaptor(&mut self, aid: AdaptorId, request: &TimeSet) -> Result<ValueSet2D> {
    let query_end = request.horizon_end();
    if !query_end.is_finite() {
      return Err(SimlinkError::ContractViolation(format!(
        "time adaptor [{}] pulled without request times",
        self.adaptors[aid.0].id
      )));
    }

    let adaptee = self.adaptors[aid.0].adaptee;
    let cid = self.adaptors[aid.0].component;

    // Step the source component until its horizon covers the request. A
    // busy component simply stops advancing here and the buffer answer
    // below extrapolates.
    loop {
      let available = self.provider_times(adaptee)?.horizon_end();
      let status = self.components[cid.0].status;
      if !matches!(status, Status::Valid | Status::Updated)
        || available + EPSILON_DAYS >= query_end
      {
        break;
      }

      self.update(cid)?;

      let after = self.provider_times(adaptee)?.horizon_end();
      if after <= available && self.components[cid.0].status == Status::Updated {
        return Err(SimlinkError::Computation(format!(
          "component [{}] stalled behind time adaptor [{}]",
          self.components[cid.0].id, self.adaptors[aid.0].id
        )));
      }
    }

    // Drain the adaptee's retained rows into the buffer.
    let inner = self.pull_provider(adaptee, request)?;
    let inner_times = self.provider_times(adaptee)?.times().to_vec();
    {
      let AdaptorKind::Time { buffer } = &mut self.adaptors[aid.0].kind else {
        unreachable!()
      };
      for (t, time) in inner_times.iter().enumerate().take(inner.time_count()) {
        let row = inner.row_as_reals(t)?;
        buffer.set_or_add_values(*time, &row)?;
      }
    }

    // Answer every requested time from the buffer.
    let quantity = self.adaptors[aid.0].quantity.clone();
    let mut out = ValueSet2D::new(ScalarKind::Real, Some(quantity));
    {
      let AdaptorKind::Time { buffer } = &self.adaptors[aid.0].kind else {
        unreachable!()
      };
      for time in request.times() {
        let row = buffer.get_values(*time)?;
        out.push_real_row(&row)?;
      }
    }

    // Retire buffered rows no consumer can ask for again.
    let earliest = self.earliest_consumer_time(&self.adaptors[aid.0].consumers);
    if let Some(earliest) = earliest {
      let AdaptorKind::Time { buffer } = &mut self.adaptors[aid.0].kind else {
        unreachable!()
      };
      buffer.clear_before(Time::stamp(earliest));
    }

    Ok(out)
  }

  /// After a component steps, drain its outputs' time-adaptor buffers so
  /// late consumers can read estimates without stepping the component.
  fn refresh_component_adaptors(&mut self, cid: ComponentId) -> Result<()> {
    for oid in self.components[cid.0].outputs.clone() {
      self.refresh_output_adaptors(oid)?;
    }
    Ok(())
  }

  fn refresh_output_adaptors(&mut self, oid: OutputId) -> Result<()> {
    let times = self.outputs[oid.0].item.time_set.times().to_vec();
    let rows: Vec<Vec<f64>> = (0..self.outputs[oid.0].item.values.time_count())
      .map(|t| self.outputs[oid.0].item.values.row_as_reals(t))
      .collect::<Result<_>>()?;

    for aid in self.outputs[oid.0].adaptors.clone() {
      self.refresh_adaptor(aid, &times, &rows)?;
    }
    Ok(())
  }

  /// Push the current `(times, rows)` of the adaptee down an adaptor chain.
  /// Time adaptors drain the rows into their buffer; space adaptors
  /// transform them for their own children.
  fn refresh_adaptor(&mut self, aid: AdaptorId, times: &[Time], rows: &[Vec<f64>]) -> Result<()> {
    let adaptor = &mut self.adaptors[aid.0];
    if !adaptor.alive || (adaptor.consumers.is_empty() && adaptor.adaptors.is_empty()) {
      return Ok(());
    }

    let passed_down: Vec<Vec<f64>> = match &mut adaptor.kind {
      AdaptorKind::Time { buffer } => {
        for (time, row) in times.iter().zip(rows) {
          buffer.set_or_add_values(*time, row)?;
        }
        rows.to_vec()
      }
      AdaptorKind::Area { factors, .. } | AdaptorKind::Length { factors, .. } => rows
        .iter()
        .map(|row| row.iter().zip(factors.iter()).map(|(v, f)| v * f).collect())
        .collect(),
      AdaptorKind::SpaceMap { mapper } => rows
        .iter()
        .map(|row| mapper.matrix().product(row))
        .collect::<Result<_>>()?,
    };

    for chained in self.adaptors[aid.0].adaptors.clone() {
      self.refresh_adaptor(chained, times, &passed_down)?;
    }
    Ok(())
  }

  // State snapshots for iterative coupling ---------------------------------

  /// Snapshot a component so one time step can be redone.
  pub fn keep_component_state(&mut self, cid: ComponentId) -> Result<ComponentSnapshot> {
    let state = self.components[cid.0].behavior.keep_state()?;
    Ok(ComponentSnapshot {
      state,
      status: self.components[cid.0].status,
      current_time: self.components[cid.0].current_time,
    })
  }

  /// Roll a component back to a snapshot: behavior state, clock and status.
  ///
  /// Output rows published by the undone step are left in place on purpose.
  /// They are the running iterate of a fixed-point sweep and get overwritten
  /// when the step is redone. Adaptor buffers, in contrast, are cleared past
  /// the restored clock so no consumer reads retracted data as settled.
  pub fn restore_component_state(&mut self, cid: ComponentId, snapshot: &ComponentSnapshot) -> Result<()> {
    self.components[cid.0].behavior.restore_state(&snapshot.state)?;
    self.components[cid.0].current_time = snapshot.current_time;
    self.components[cid.0].status = snapshot.status;

    if let Some(now) = snapshot.current_time {
      let cutoff = Time::stamp(now.timestamp() + EPSILON_DAYS);
      for oid in self.components[cid.0].outputs.clone() {
        for aid in self.outputs[oid.0].adaptors.clone() {
          if let AdaptorKind::Time { buffer } = &mut self.adaptors[aid.0].kind {
            buffer.clear_after(cutoff);
          }
        }
      }
    }
    Ok(())
  }

  /// Discard a snapshot once its step has been accepted.
  pub fn drop_component_state(&mut self, cid: ComponentId, snapshot: &ComponentSnapshot) {
    let _ = self.components[cid.0].behavior.clear_state(&snapshot.state);
  }

  /// Disable retirement of pulled input rows so steps can be redone.
  pub fn set_retirement_disabled(&mut self, cid: ComponentId, disabled: bool) {
    self.components[cid.0].retirement_disabled = disabled;
  }

  #[cfg(test)]
  pub(crate) fn inputs_mut_for_tests(&mut self, iid: InputId) -> &mut InputItem {
    &mut self.inputs[iid.0]
  }
}

/// Sum one provider row into the accumulator, skipping the provider's
/// missing-data sentinel.
fn accumulate_row(row: &mut [f64], values: &ValueSet2D, t: usize, missing: f64) -> Result<()> {
  for (e, slot) in row.iter_mut().enumerate().take(values.element_count()) {
    let v = values.value(t, e)?.as_real();
    if v != missing {
      *slot += v;
    }
  }
  Ok(())
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;
