use crate::element::ElementSet;
use crate::error::SimlinkError;
use crate::exchange::ProviderRef;
use crate::quantity::{Quantity, Unit};

use crate::component::test_utils::{test_quantity, FailingBehavior, SinkBehavior, SourceBehavior};

use super::*;

fn id_elements() -> ElementSet {
  ElementSet::id_based("nodes", &["n0", "n1"])
}

fn simple_series() -> Vec<(f64, Vec<f64>)> {
  vec![
    (0.0, vec![0.0, 0.0]),
    (1.0, vec![1.0, 10.0]),
    (2.0, vec![2.0, 20.0]),
  ]
}

fn build_pair(graph: &mut LinkGraph) -> (crate::exchange::OutputId, crate::exchange::InputId) {
  let source = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );
  let sink = graph.add_component(
    "sink",
    Box::new(SinkBehavior::new(id_elements(), vec![1.0, 2.0], 1.0)),
  );

  for cid in [source, sink] {
    graph.initialize(cid).unwrap();
    assert!(graph.validate(cid).unwrap().is_empty());
  }

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  (oid, iid)
}

#[test]
fn test_lifecycle_statuses() {
  let mut graph = LinkGraph::new();
  let cid = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );

  assert_eq!(graph.component(cid).status, Status::Created);
  graph.initialize(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Initialized);
  graph.validate(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Valid);
  graph.prepare(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Updated);

  // Steps to 1.0, then 2.0, then Done.
  graph.update(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Updated);
  graph.update(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Done);

  // Terminal updates are no-ops.
  graph.update(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Done);

  graph.finish(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Finished);
}

#[test]
fn test_update_before_prepare_is_illegal() {
  let mut graph = LinkGraph::new();
  let cid = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );
  graph.initialize(cid).unwrap();

  let err = graph.update(cid).unwrap_err();
  assert!(matches!(err, SimlinkError::ContractViolation(_)));
}

#[test]
fn test_connect_is_reciprocal() {
  let mut graph = LinkGraph::new();
  let (oid, iid) = build_pair(&mut graph);

  graph.connect(oid, iid).unwrap();
  assert!(graph.output(oid).consumers.contains(&iid));
  assert!(graph.input(iid).providers.contains(&ProviderRef::Output(oid)));

  // Connecting twice is a no-op.
  graph.connect(oid, iid).unwrap();
  assert_eq!(graph.output(oid).consumers.len(), 1);

  graph.disconnect(oid, iid);
  assert!(graph.output(oid).consumers.is_empty());
  assert!(graph.input(iid).providers.is_empty());
}

#[test]
fn test_incompatible_quantity_rejected() {
  let mut graph = LinkGraph::new();
  let (oid, _) = build_pair(&mut graph);

  // A sink with a different quantity cannot connect.
  let other = graph.add_component(
    "other",
    Box::new(SinkBehavior::new(id_elements(), vec![1.0], 1.0)),
  );
  graph.initialize(other).unwrap();
  let iid = graph.find_input(other, "in").unwrap();
  graph.inputs_mut_for_tests(iid).item.quantity =
    Quantity::new(Unit::meter(), "different", "different");

  let err = graph.connect(oid, iid).unwrap_err();
  assert!(matches!(err, SimlinkError::IncompatibleItem(_)));
  assert!(graph.output(oid).consumers.is_empty());
  assert!(graph.input(iid).providers.is_empty());
}

#[test]
fn test_incompatible_elements_rejected() {
  let mut graph = LinkGraph::new();
  let source = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );
  let sink = graph.add_component(
    "sink",
    Box::new(SinkBehavior::new(
      ElementSet::id_based("nodes", &["n0", "other"]),
      vec![1.0],
      1.0,
    )),
  );
  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  assert!(matches!(
    graph.connect(oid, iid),
    Err(SimlinkError::IncompatibleItem(_))
  ));
}

#[test]
fn test_pull_steps_producer_on_demand() {
  let mut graph = LinkGraph::new();
  let (oid, iid) = build_pair(&mut graph);
  graph.connect(oid, iid).unwrap();

  let source = graph.output(oid).item.component;
  let sink = graph.input(iid).item.component;
  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();

  // Pulling the input drives the producer forward to the latest request.
  let values = graph.pull_input(iid).unwrap();
  assert_eq!(values.time_count(), 2);
  assert_eq!(values.row_as_reals(0).unwrap(), vec![1.0, 10.0]);
  assert_eq!(values.row_as_reals(1).unwrap(), vec![2.0, 20.0]);
  assert_eq!(graph.component(source).status, Status::Done);
}

#[test]
fn test_pull_after_done_returns_last_values() {
  let mut graph = LinkGraph::new();
  let (oid, iid) = build_pair(&mut graph);
  graph.connect(oid, iid).unwrap();

  let source = graph.output(oid).item.component;
  let sink = graph.input(iid).item.component;
  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();

  let first = graph.pull_output(oid).unwrap();
  let again = graph.pull_output(oid).unwrap();
  assert_eq!(first.rows(), again.rows());
}

#[test]
fn test_failed_step_marks_component_failed() {
  let mut graph = LinkGraph::new();
  let cid = graph.add_component("bad", Box::new(FailingBehavior::new(id_elements())));
  graph.initialize(cid).unwrap();
  graph.validate(cid).unwrap();
  graph.prepare(cid).unwrap();

  let err = graph.update(cid).unwrap_err();
  assert!(matches!(err, SimlinkError::Computation(_)));
  // Failure finishes the component; further updates are no-ops.
  assert_eq!(graph.component(cid).status, Status::Finished);
  graph.update(cid).unwrap();
}

#[test]
fn test_finish_invalidates_weak_edges() {
  let mut graph = LinkGraph::new();
  let (oid, iid) = build_pair(&mut graph);
  graph.connect(oid, iid).unwrap();

  let source = graph.output(oid).item.component;
  let sink = graph.input(iid).item.component;
  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();
  graph.run().unwrap();
  graph.finish(source).unwrap();

  // The provider edge is stale now; pulling skips it and yields no rows.
  assert!(!graph.provider_alive(ProviderRef::Output(oid)));
  let values = graph.pull_input(iid).unwrap();
  for t in 0..values.time_count() {
    assert_eq!(values.row_as_reals(t).unwrap(), vec![0.0, 0.0]);
  }
}

#[test]
fn test_reset_restarts_lifecycle() {
  let mut graph = LinkGraph::new();
  let cid = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );
  graph.initialize(cid).unwrap();
  graph.validate(cid).unwrap();
  graph.prepare(cid).unwrap();

  // Updated -> Finishing -> Created is the restartable path.
  graph.reset(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Created);
  assert!(graph.component(cid).outputs.is_empty());

  // The component can go through initialization again.
  graph.initialize(cid).unwrap();
  assert_eq!(graph.component(cid).status, Status::Initialized);
}

#[test]
fn test_status_events_are_broadcast() {
  let mut graph = LinkGraph::new();
  let rx = graph.subscribe();
  let cid = graph.add_component(
    "source",
    Box::new(SourceBehavior::new(id_elements(), simple_series())),
  );
  graph.initialize(cid).unwrap();

  let events: Vec<Event> = rx.try_iter().collect();
  assert!(events.iter().any(|e| matches!(
    e,
    Event::StatusChanged { new: Status::Initialized, .. }
  )));
}

#[test]
fn test_quantity_helper_matches() {
  // The helper quantity used across the tests stays self-consistent.
  assert_eq!(test_quantity(), test_quantity());
}
