//! JSON link-configuration loading and graph assembly.
//!
//! The link file declares components (`comps`) and the data links between
//! them (`links`); each link carries one or more pipelines from a source
//! output to a target input, optionally through temporal and spatial
//! operator stages. Links in `"loop"` mode join an iteration group driven
//! to a fixed point by an [`IterationController`].

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::component::{BehaviorRegistry, IterationConfig, IterationController, LinkGraph};
use crate::error::{Result, SimlinkError};
use crate::exchange::{ComponentId, ProviderRef};
use crate::mapper::MapMethod;

use super::task::load_task;

/// One component declaration: behavior type, task file and library path.
#[derive(Clone, Debug, Deserialize)]
pub struct ComponentConfig {
  #[serde(rename = "type")]
  pub type_name: String,
  #[serde(default)]
  pub task: String,
  #[serde(default)]
  pub dll: String,
}

/// One data pipeline from a source output to a target input.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
  pub src_component: String,
  pub src_state: String,
  #[serde(default)]
  pub src_elements: Vec<String>,
  pub tar_component: String,
  pub tar_element: String,
  #[serde(default)]
  pub temporal_operators: Vec<String>,
  #[serde(default)]
  pub spatial_operators: Vec<String>,
}

/// One link: its pipelines, exchange mode and free-form parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkEntry {
  pub pipelines: Vec<PipelineConfig>,
  #[serde(default)]
  pub mode: Option<String>,
  #[serde(default)]
  pub params: HashMap<String, String>,
}

/// The whole link-configuration file.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkConfig {
  pub comps: HashMap<String, ComponentConfig>,
  pub links: HashMap<String, LinkEntry>,
}

/// A set of components coupled through `"loop"` links, plus the union of
/// those links' parameters.
#[derive(Clone, Debug)]
pub struct IterationGroup {
  pub link_ids: Vec<String>,
  pub components: BTreeSet<String>,
  pub params: HashMap<String, String>,
}

/// Loads a link file and assembles the runtime graph from it.
#[derive(Debug)]
pub struct LinkLoader {
  path: PathBuf,
  config: LinkConfig,
}

impl LinkLoader {
  /// Parse the link-configuration file.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    info!(file = %path.display(), "loading link configuration");

    let text = std::fs::read_to_string(&path).map_err(|e| {
      SimlinkError::Config(format!("cannot read link file [{}]: {e}", path.display()))
    })?;
    let config: LinkConfig = serde_json::from_str(&text).map_err(|e| {
      SimlinkError::Config(format!("malformed link file [{}]: {e}", path.display()))
    })?;

    for (id, link) in &config.links {
      match link.mode.as_deref() {
        None | Some("pull") | Some("loop") => {}
        Some(other) => {
          return Err(SimlinkError::Config(format!(
            "link [{id}] has unknown mode [{other}]"
          )));
        }
      }
    }

    Ok(Self { path, config })
  }

  pub fn config(&self) -> &LinkConfig {
    &self.config
  }

  pub fn component_ids(&self) -> Vec<&str> {
    self.config.comps.keys().map(String::as_str).collect()
  }

  pub fn component_info(&self, id: &str) -> Option<&ComponentConfig> {
    self.config.comps.get(id)
  }

  /// The directory task-file paths are resolved against.
  fn base_dir(&self) -> &Path {
    self.path.parent().unwrap_or_else(|| Path::new("."))
  }

  /// Collect `"loop"` links into iteration groups, merging groups that
  /// share a component.
  pub fn iteration_groups(&self) -> Vec<IterationGroup> {
    let mut groups: Vec<IterationGroup> = Vec::new();

    let mut loop_links: Vec<&String> = self
      .config
      .links
      .iter()
      .filter(|(_, link)| link.mode.as_deref() == Some("loop"))
      .map(|(id, _)| id)
      .collect();
    loop_links.sort();

    for link_id in loop_links {
      let link = &self.config.links[link_id];
      let mut components = BTreeSet::new();
      for pipeline in &link.pipelines {
        components.insert(pipeline.src_component.clone());
        components.insert(pipeline.tar_component.clone());
      }

      match groups
        .iter_mut()
        .find(|group| !group.components.is_disjoint(&components))
      {
        Some(group) => {
          group.link_ids.push(link_id.clone());
          group.components.extend(components);
          group.params.extend(link.params.clone());
        }
        None => groups.push(IterationGroup {
          link_ids: vec![link_id.clone()],
          components,
          params: link.params.clone(),
        }),
      }
    }

    groups
  }

  /// Build the link graph: create and initialize every component through
  /// the registry, wire every pipeline (with its adaptor stages), and set
  /// up one iteration controller per loop group.
  pub fn assemble(
    &self,
    registry: &BehaviorRegistry,
  ) -> Result<(LinkGraph, Vec<IterationController>)> {
    let mut graph = LinkGraph::new();
    let mut component_ids: HashMap<String, ComponentId> = HashMap::new();

    let mut comp_names: Vec<&String> = self.config.comps.keys().collect();
    comp_names.sort();
    for name in comp_names {
      let comp = &self.config.comps[name];
      let task = if comp.task.is_empty() {
        serde_yaml::Value::Null
      } else {
        load_task(self.base_dir().join(&comp.task))?
      };

      let behavior = registry.create(&comp.type_name, name, &task)?;
      let cid = graph.add_component(name.clone(), behavior);
      graph.initialize(cid)?;
      let errors = graph.validate(cid)?;
      if !errors.is_empty() {
        return Err(SimlinkError::Config(format!(
          "component [{name}] is invalid: {}",
          errors.join("; ")
        )));
      }
      component_ids.insert(name.clone(), cid);
    }

    let mut link_names: Vec<&String> = self.config.links.keys().collect();
    link_names.sort();
    for link_id in link_names {
      let link = &self.config.links[link_id];
      for (n, pipeline) in link.pipelines.iter().enumerate() {
        self.wire_pipeline(&mut graph, &component_ids, link_id, n, pipeline)?;
      }
    }

    let mut controllers = Vec::new();
    for group in self.iteration_groups() {
      let members = group
        .components
        .iter()
        .map(|name| {
          component_ids.get(name).copied().ok_or_else(|| {
            SimlinkError::Config(format!(
              "iteration group references unknown component [{name}]"
            ))
          })
        })
        .collect::<Result<Vec<_>>>()?;

      let config = iteration_config_from_params(&group.params)?;
      let mut controller =
        IterationController::new(group.link_ids.join("+"), members, config);
      controller.initialize(&mut graph)?;
      controllers.push(controller);
    }

    Ok((graph, controllers))
  }

  fn wire_pipeline(
    &self,
    graph: &mut LinkGraph,
    component_ids: &HashMap<String, ComponentId>,
    link_id: &str,
    index: usize,
    pipeline: &PipelineConfig,
  ) -> Result<()> {
    let src = *component_ids.get(&pipeline.src_component).ok_or_else(|| {
      SimlinkError::Config(format!(
        "link [{link_id}] references unknown component [{}]",
        pipeline.src_component
      ))
    })?;
    let tar = *component_ids.get(&pipeline.tar_component).ok_or_else(|| {
      SimlinkError::Config(format!(
        "link [{link_id}] references unknown component [{}]",
        pipeline.tar_component
      ))
    })?;

    let oid = graph.find_output(src, &pipeline.src_state).ok_or_else(|| {
      SimlinkError::Config(format!(
        "component [{}] has no output [{}]",
        pipeline.src_component, pipeline.src_state
      ))
    })?;
    let iid = graph.find_input(tar, &pipeline.tar_element).ok_or_else(|| {
      SimlinkError::Config(format!(
        "component [{}] has no input [{}]",
        pipeline.tar_component, pipeline.tar_element
      ))
    })?;

    // Chain the adaptor stages onto the provider: space first, then time.
    let mut provider = ProviderRef::Output(oid);
    for (s, op) in pipeline.spatial_operators.iter().enumerate() {
      let method = MapMethod::from_name(op)?;
      let target = graph.input(iid).item.element_set.clone();
      let aid = graph.add_space_map_adaptor(
        provider,
        format!("{link_id}-{index}-space-{s}"),
        method,
        target,
      )?;
      provider = ProviderRef::Adapted(aid);
    }
    for (t, _op) in pipeline.temporal_operators.iter().enumerate() {
      let aid = graph.add_time_adaptor(provider, format!("{link_id}-{index}-time-{t}"))?;
      provider = ProviderRef::Adapted(aid);
    }

    match provider {
      ProviderRef::Output(oid) => graph.connect(oid, iid),
      ProviderRef::Adapted(aid) => graph.connect_adapted(aid, iid),
    }
  }
}

fn iteration_config_from_params(params: &HashMap<String, String>) -> Result<IterationConfig> {
  let mut config = IterationConfig::default();
  if let Some(value) = params.get("max_iter") {
    config.max_iter = value
      .parse()
      .map_err(|_| SimlinkError::Config(format!("invalid max_iter [{value}]")))?;
  }
  if let Some(value) = params.get("eps") {
    config.eps = value
      .parse()
      .map_err(|_| SimlinkError::Config(format!("invalid eps [{value}]")))?;
  }
  if let Some(value) = params.get("relaxation") {
    config.relaxation = value
      .parse()
      .map_err(|_| SimlinkError::Config(format!("invalid relaxation [{value}]")))?;
  }
  Ok(config)
}

#[cfg(test)]
#[path = "link_loader_test.rs"]
mod link_loader_test;
