//! End-to-end coupling scenarios across the pull engine and adaptors.

use approx::assert_relative_eq;
use glam::DVec2;

use crate::element::ElementSet;
use crate::exchange::ProviderRef;
use crate::mapper::MapMethod;

use super::test_utils::{SinkBehavior, SourceBehavior};
use super::*;

fn square(x0: f64, y0: f64, side: f64) -> Vec<DVec2> {
  vec![
    DVec2::new(x0, y0),
    DVec2::new(x0 + side, y0),
    DVec2::new(x0 + side, y0 + side),
    DVec2::new(x0, y0 + side),
  ]
}

fn prepare_all(graph: &mut LinkGraph) {
  for cid in graph.component_ids() {
    if graph.component(cid).status == Status::Created {
      graph.initialize(cid).unwrap();
      assert!(graph.validate(cid).unwrap().is_empty());
    }
  }
  for cid in graph.component_ids() {
    graph.prepare(cid).unwrap();
  }
}

/// Two components over identical ten-element id-based sets; after one
/// update the input's values equal the output's.
#[test]
fn test_identity_pipeline() {
  let ids: Vec<String> = (0..10).map(|i| format!("e{i}")).collect();
  let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
  let elements = ElementSet::id_based("ids", &id_refs);

  let emitted: Vec<f64> = (0..10).map(|i| i as f64 * 1.25).collect();
  let series = vec![(0.0, vec![0.0; 10]), (1.0, emitted.clone())];

  let mut graph = LinkGraph::new();
  let source = graph.add_component(
    "producer",
    Box::new(SourceBehavior::new(elements.clone(), series)),
  );
  let sink_behavior = SinkBehavior::new(elements, vec![1.0], 1.0);
  let received = sink_behavior.received_handle();
  let sink = graph.add_component("consumer", Box::new(sink_behavior));

  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();
  graph.validate(source).unwrap();
  graph.validate(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  graph.connect(oid, iid).unwrap();

  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();
  graph.update(sink).unwrap();

  let grids = received.lock().unwrap();
  let grid = grids.last().expect("sink received values");
  let got = grid.row_as_reals(0).unwrap();
  for (a, b) in got.iter().zip(&emitted) {
    assert_relative_eq!(a, b, epsilon = 1e-12);
  }
}

/// A value of 3.0 over polygons, scaled by polygon area through the area
/// adaptor.
#[test]
fn test_spatial_area_scaling() {
  for (side, exponent, expected) in [
    (1.0, 1.0, 3.0),
    (1.0, 2.0, 3.0),
    (2.0, 1.0, 12.0),
  ] {
    let elements = ElementSet::polygon("sq", &square(0.0, 0.0, side));
    let series = vec![(0.0, vec![3.0]), (1.0, vec![3.0])];

    let mut graph = LinkGraph::new();
    let source = graph.add_component(
      "producer",
      Box::new(SourceBehavior::new(elements.clone(), series)),
    );
    let sink_behavior = SinkBehavior::new(elements, vec![1.0], 1.0);
    let received = sink_behavior.received_handle();
    let sink = graph.add_component("consumer", Box::new(sink_behavior));

    graph.initialize(source).unwrap();
    graph.initialize(sink).unwrap();
    graph.validate(source).unwrap();
    graph.validate(sink).unwrap();

    let oid = graph.find_output(source, "out").unwrap();
    let iid = graph.find_input(sink, "in").unwrap();
    let adaptor = graph
      .add_area_adaptor(ProviderRef::Output(oid), "area-scale", exponent)
      .unwrap();
    graph.connect_adapted(adaptor, iid).unwrap();

    graph.prepare(source).unwrap();
    graph.prepare(sink).unwrap();
    graph.update(sink).unwrap();

    let grids = received.lock().unwrap();
    let got = grids.last().unwrap().row_as_reals(0).unwrap()[0];
    assert_relative_eq!(got, expected, epsilon = 1e-9);
  }
}

/// Producer emits 0 at t=0 and 10 at t=2; the consumer requests t=1
/// through a time adaptor and reads the interpolated 5.0.
#[test]
fn test_temporal_interpolation() {
  let elements = ElementSet::id_based("ids", &["e0"]);
  let series = vec![(0.0, vec![0.0]), (2.0, vec![10.0])];

  let mut graph = LinkGraph::new();
  let source = graph.add_component(
    "producer",
    Box::new(SourceBehavior::new(elements.clone(), series)),
  );
  let sink_behavior = SinkBehavior::new(elements, vec![1.0], 1.0);
  let received = sink_behavior.received_handle();
  let sink = graph.add_component("consumer", Box::new(sink_behavior));

  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();
  graph.validate(source).unwrap();
  graph.validate(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  let adaptor = graph
    .add_time_adaptor(ProviderRef::Output(oid), "interp")
    .unwrap();
  graph.connect_adapted(adaptor, iid).unwrap();

  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();
  graph.update(sink).unwrap();

  let grids = received.lock().unwrap();
  let got = grids.last().unwrap().row_as_reals(0).unwrap()[0];
  assert_relative_eq!(got, 5.0, epsilon = 1e-9);
}

/// Source points (0.25, 0.25) and (0.75, 0.75) with values 4 and 6, mapped
/// onto the unit square with Mean, read 5 at the consumer.
#[test]
fn test_point_to_polygon_mean_pipeline() {
  let points = ElementSet::points("pts", &[DVec2::new(0.25, 0.25), DVec2::new(0.75, 0.75)]);
  let polygon = ElementSet::polygon("sq", &square(0.0, 0.0, 1.0));
  let series = vec![(0.0, vec![4.0, 6.0]), (1.0, vec![4.0, 6.0])];

  let mut graph = LinkGraph::new();
  let source = graph.add_component(
    "producer",
    Box::new(SourceBehavior::new(points, series)),
  );
  let sink_behavior = SinkBehavior::new(polygon.clone(), vec![1.0], 1.0);
  let received = sink_behavior.received_handle();
  let sink = graph.add_component("consumer", Box::new(sink_behavior));

  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();
  graph.validate(source).unwrap();
  graph.validate(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  let adaptor = graph
    .add_space_map_adaptor(ProviderRef::Output(oid), "onto-square", MapMethod::Mean, polygon)
    .unwrap();
  graph.connect_adapted(adaptor, iid).unwrap();

  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();
  graph.update(sink).unwrap();

  let grids = received.lock().unwrap();
  let got = grids.last().unwrap().row_as_reals(0).unwrap();
  assert_eq!(got.len(), 1);
  assert_relative_eq!(got[0], 5.0, epsilon = 1e-9);
}

/// A 2x2 source square carrying 8, distributed onto a unit sub-square,
/// reads 2 at the consumer.
#[test]
fn test_polygon_distribute_pipeline() {
  let big = ElementSet::polygon("big", &square(0.0, 0.0, 2.0));
  let small = ElementSet::polygon("small", &square(0.5, 0.5, 1.0));
  let series = vec![(0.0, vec![8.0]), (1.0, vec![8.0])];

  let mut graph = LinkGraph::new();
  let source = graph.add_component("producer", Box::new(SourceBehavior::new(big, series)));
  let sink_behavior = SinkBehavior::new(small.clone(), vec![1.0], 1.0);
  let received = sink_behavior.received_handle();
  let sink = graph.add_component("consumer", Box::new(sink_behavior));

  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();
  graph.validate(source).unwrap();
  graph.validate(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  let adaptor = graph
    .add_space_map_adaptor(
      ProviderRef::Output(oid),
      "distribute",
      MapMethod::Distribute,
      small,
    )
    .unwrap();
  graph.connect_adapted(adaptor, iid).unwrap();

  graph.prepare(source).unwrap();
  graph.prepare(sink).unwrap();
  graph.update(sink).unwrap();

  let grids = received.lock().unwrap();
  let got = grids.last().unwrap().row_as_reals(0).unwrap()[0];
  assert_relative_eq!(got, 2.0, epsilon = 1e-6);
}

/// Driving a three-stage chain through `run` leaves every component Done.
#[test]
fn test_run_drives_all_components_done() {
  let elements = ElementSet::id_based("ids", &["a", "b", "c"]);
  let series = vec![
    (0.0, vec![0.0; 3]),
    (1.0, vec![1.0; 3]),
    (2.0, vec![2.0; 3]),
    (3.0, vec![3.0; 3]),
  ];

  let mut graph = LinkGraph::new();
  let source = graph.add_component(
    "producer",
    Box::new(SourceBehavior::new(elements.clone(), series)),
  );
  let sink = graph.add_component(
    "consumer",
    Box::new(SinkBehavior::new(elements, vec![1.0, 2.0, 3.0], 1.0)),
  );

  graph.initialize(source).unwrap();
  graph.initialize(sink).unwrap();
  graph.validate(source).unwrap();
  graph.validate(sink).unwrap();

  let oid = graph.find_output(source, "out").unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  graph.connect(oid, iid).unwrap();

  prepare_all(&mut graph);
  graph.run().unwrap();

  for cid in graph.component_ids() {
    assert_eq!(graph.component(cid).status, Status::Done);
  }
}
