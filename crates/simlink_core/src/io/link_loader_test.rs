use std::fs;

use approx::assert_relative_eq;
use tempfile::TempDir;

use crate::component::test_utils::{SinkBehavior, SourceBehavior};
use crate::component::{BehaviorRegistry, Status};
use crate::element::ElementSet;

use super::*;

const LINK_JSON: &str = r#"{
  "comps": {
    "upstream": { "type": "scripted-source", "task": "", "dll": "" },
    "downstream": { "type": "recording-sink", "task": "", "dll": "" }
  },
  "links": {
    "l1": {
      "pipelines": [
        {
          "src_component": "upstream",
          "src_state": "out",
          "src_elements": ["e0"],
          "tar_component": "downstream",
          "tar_element": "in",
          "temporal_operators": ["interpolate"]
        }
      ],
      "mode": "pull",
      "params": {}
    }
  }
}"#;

fn write_link_file(dir: &TempDir, contents: &str) -> std::path::PathBuf {
  let path = dir.path().join("links.json");
  fs::write(&path, contents).unwrap();
  path
}

fn test_registry() -> BehaviorRegistry {
  let mut registry = BehaviorRegistry::new();
  registry.register("scripted-source", |_id, _task| {
    Ok(Box::new(SourceBehavior::new(
      ElementSet::id_based("ids", &["e0"]),
      vec![(0.0, vec![0.0]), (2.0, vec![10.0])],
    )))
  });
  registry.register("recording-sink", |_id, _task| {
    Ok(Box::new(SinkBehavior::new(
      ElementSet::id_based("ids", &["e0"]),
      vec![1.0],
      1.0,
    )))
  });
  registry
}

#[test]
fn test_load_and_query() {
  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, LINK_JSON);

  let loader = LinkLoader::load(&path).unwrap();
  let mut ids = loader.component_ids();
  ids.sort_unstable();
  assert_eq!(ids, vec!["downstream", "upstream"]);
  assert_eq!(
    loader.component_info("upstream").unwrap().type_name,
    "scripted-source"
  );
  assert!(loader.iteration_groups().is_empty());
}

#[test]
fn test_assemble_and_run() {
  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, LINK_JSON);

  let loader = LinkLoader::load(&path).unwrap();
  let (mut graph, controllers) = loader.assemble(&test_registry()).unwrap();
  assert!(controllers.is_empty());
  assert_eq!(graph.component_count(), 2);

  for cid in graph.component_ids() {
    graph.prepare(cid).unwrap();
  }
  graph.run().unwrap();

  for cid in graph.component_ids() {
    assert_eq!(graph.component(cid).status, Status::Done);
  }

  // The time adaptor interpolated the scripted ramp at t=1.
  let sink = graph
    .component_ids()
    .into_iter()
    .find(|cid| graph.component(*cid).id == "downstream")
    .unwrap();
  let iid = graph.find_input(sink, "in").unwrap();
  let values = &graph.input(iid).item.values;
  assert_relative_eq!(
    values.row_as_reals(0).unwrap()[0],
    5.0,
    epsilon = 1e-9
  );
}

#[test]
fn test_loop_links_form_iteration_groups() {
  let json = r#"{
    "comps": {
      "a": { "type": "scripted-source", "task": "", "dll": "" },
      "b": { "type": "recording-sink", "task": "", "dll": "" }
    },
    "links": {
      "l1": {
        "pipelines": [
          { "src_component": "a", "src_state": "out",
            "tar_component": "b", "tar_element": "in" }
        ],
        "mode": "loop",
        "params": { "max_iter": "5", "eps": "0.001" }
      }
    }
  }"#;

  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, json);
  let loader = LinkLoader::load(&path).unwrap();

  let groups = loader.iteration_groups();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].components.len(), 2);
  assert_eq!(groups[0].params["max_iter"], "5");
}

#[test]
fn test_unknown_mode_rejected() {
  let json = r#"{
    "comps": {},
    "links": {
      "l1": { "pipelines": [], "mode": "push", "params": {} }
    }
  }"#;

  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, json);
  assert!(matches!(
    LinkLoader::load(&path),
    Err(SimlinkError::Config(_))
  ));
}

#[test]
fn test_unknown_component_type_rejected() {
  let json = r#"{
    "comps": { "c": { "type": "no-such-type", "task": "", "dll": "" } },
    "links": {}
  }"#;

  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, json);
  let loader = LinkLoader::load(&path).unwrap();
  assert!(loader.assemble(&test_registry()).is_err());
}

#[test]
fn test_malformed_json_rejected() {
  let dir = TempDir::new().unwrap();
  let path = write_link_file(&dir, "{ not json");
  assert!(matches!(
    LinkLoader::load(&path),
    Err(SimlinkError::Config(_))
  ));
}
