//! CSV mesh directory loader.
//!
//! A mesh directory holds `nodes.csv`, `faces.csv` and `cells.csv`, each
//! with a header row and rows indexed by a strictly increasing integer id
//! starting at zero, plus optional `patches.csv` and `zones.csv`. Face and
//! cell centroids are arithmetic means of their constituent coordinates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::DVec3;
use tracing::info;

use crate::error::{Result, SimlinkError};
use crate::mesh::Grid;

/// Reads one mesh directory into coordinate and index maps.
#[derive(Debug, Default)]
pub struct MeshLoader {
  dir: PathBuf,
  node_coords: HashMap<usize, DVec3>,
  face_coords: HashMap<usize, DVec3>,
  cell_coords: HashMap<usize, DVec3>,
  face_nodes: HashMap<usize, Vec<usize>>,
  cell_faces: HashMap<usize, Vec<usize>>,
  patch_faces: HashMap<String, Vec<usize>>,
  zone_faces: HashMap<String, Vec<usize>>,
}

impl MeshLoader {
  pub fn new(mesh_dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = mesh_dir.into();
    if !dir.is_dir() {
      return Err(SimlinkError::Config(format!(
        "mesh directory [{}] does not exist",
        dir.display()
      )));
    }
    Ok(Self {
      dir,
      ..Self::default()
    })
  }

  /// Load all mesh files and derive face and cell centroids.
  pub fn load(&mut self) -> Result<()> {
    info!(dir = %self.dir.display(), "loading mesh");

    self.load_nodes()?;
    self.load_faces()?;
    self.load_cells()?;
    self.load_patches()?;
    self.load_zones()?;

    self.generate_face_coordinates();
    self.generate_cell_coordinates();

    info!(
      nodes = self.node_coords.len(),
      faces = self.face_nodes.len(),
      cells = self.cell_faces.len(),
      "mesh loaded"
    );
    Ok(())
  }

  /// Hand the loaded maps to a grid (patches and zones included).
  pub fn into_grid(self) -> Result<Grid> {
    let mut grid = Grid::from_maps(
      &self.node_coords,
      &self.face_coords,
      &self.cell_coords,
      &self.face_nodes,
      &self.cell_faces,
    )?;
    grid.set_patches(self.patch_faces);
    grid.set_zones(self.zone_faces);
    Ok(grid)
  }

  pub fn node_coordinates(&self) -> &HashMap<usize, DVec3> {
    &self.node_coords
  }

  pub fn face_nodes(&self) -> &HashMap<usize, Vec<usize>> {
    &self.face_nodes
  }

  pub fn cell_faces(&self) -> &HashMap<usize, Vec<usize>> {
    &self.cell_faces
  }

  pub fn patches(&self) -> &HashMap<String, Vec<usize>> {
    &self.patch_faces
  }

  pub fn zones(&self) -> &HashMap<String, Vec<usize>> {
    &self.zone_faces
  }

  fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
      .has_headers(true)
      .flexible(true)
      .trim(csv::Trim::All)
      .from_path(path)
      .map_err(|e| SimlinkError::Config(format!("cannot read [{}]: {e}", path.display())))
  }

  fn load_nodes(&mut self) -> Result<()> {
    let path = self.dir.join("nodes.csv");
    if !path.is_file() {
      return Err(SimlinkError::Config(format!(
        "missing required mesh file [{}]",
        path.display()
      )));
    }

    let mut ids = Vec::new();
    for record in Self::reader(&path)?.records() {
      let record = bad_row(record, &path)?;
      let fields = parse_row(&record, &path, 4)?;
      let id = fields[0] as usize;
      ids.push(id);
      self
        .node_coords
        .insert(id, DVec3::new(fields[1], fields[2], fields[3]));
    }
    check_ids(&ids, "node")
  }

  fn load_faces(&mut self) -> Result<()> {
    let path = self.dir.join("faces.csv");
    if !path.is_file() {
      return Err(SimlinkError::Config(format!(
        "missing required mesh file [{}]",
        path.display()
      )));
    }

    let mut ids = Vec::new();
    for record in Self::reader(&path)?.records() {
      let record = bad_row(record, &path)?;
      let fields = parse_row(&record, &path, 3)?;
      let id = fields[0] as usize;
      ids.push(id);
      self
        .face_nodes
        .insert(id, fields[1..].iter().map(|v| *v as usize).collect());
    }
    check_ids(&ids, "face")
  }

  fn load_cells(&mut self) -> Result<()> {
    let path = self.dir.join("cells.csv");
    if !path.is_file() {
      return Err(SimlinkError::Config(format!(
        "missing required mesh file [{}]",
        path.display()
      )));
    }

    let mut ids = Vec::new();
    for record in Self::reader(&path)?.records() {
      let record = bad_row(record, &path)?;
      let fields = parse_row(&record, &path, 2)?;
      let id = fields[0] as usize;
      ids.push(id);
      self
        .cell_faces
        .insert(id, fields[1..].iter().map(|v| *v as usize).collect());
    }
    check_ids(&ids, "cell")
  }

  fn load_named_faces(&self, file: &str) -> Result<Option<HashMap<String, Vec<usize>>>> {
    let path = self.dir.join(file);
    if !path.is_file() {
      // Optional file; silently absent.
      return Ok(None);
    }

    let mut map = HashMap::new();
    for record in Self::reader(&path)?.records() {
      let record = bad_row(record, &path)?;
      let mut iter = record.iter();
      let name = iter
        .next()
        .ok_or_else(|| {
          SimlinkError::Config(format!("empty row in [{}]", path.display()))
        })?
        .to_string();
      let faces = iter
        .map(|v| {
          v.parse::<usize>().map_err(|_| {
            SimlinkError::Config(format!("invalid face id [{v}] in [{}]", path.display()))
          })
        })
        .collect::<Result<Vec<usize>>>()?;
      map.insert(name, faces);
    }
    Ok(Some(map))
  }

  fn load_patches(&mut self) -> Result<()> {
    if let Some(patches) = self.load_named_faces("patches.csv")? {
      self.patch_faces = patches;
    }
    Ok(())
  }

  fn load_zones(&mut self) -> Result<()> {
    if let Some(zones) = self.load_named_faces("zones.csv")? {
      self.zone_faces = zones;
    }
    Ok(())
  }

  fn generate_face_coordinates(&mut self) {
    for (&id, node_ids) in &self.face_nodes {
      let sum: DVec3 = node_ids
        .iter()
        .filter_map(|node_id| self.node_coords.get(node_id))
        .copied()
        .sum();
      self.face_coords.insert(id, sum / node_ids.len() as f64);
    }
  }

  fn generate_cell_coordinates(&mut self) {
    for (&id, face_ids) in &self.cell_faces {
      let sum: DVec3 = face_ids
        .iter()
        .filter_map(|face_id| self.face_coords.get(face_id))
        .copied()
        .sum();
      self.cell_coords.insert(id, sum / face_ids.len() as f64);
    }
  }
}

fn bad_row(
  record: std::result::Result<csv::StringRecord, csv::Error>,
  path: &Path,
) -> Result<csv::StringRecord> {
  record.map_err(|e| SimlinkError::Config(format!("bad row in [{}]: {e}", path.display())))
}

fn parse_row(record: &csv::StringRecord, path: &Path, min_fields: usize) -> Result<Vec<f64>> {
  if record.len() < min_fields {
    return Err(SimlinkError::Config(format!(
      "row with {} fields in [{}], expected at least {min_fields}",
      record.len(),
      path.display()
    )));
  }
  record
    .iter()
    .map(|v| {
      v.parse::<f64>().map_err(|_| {
        SimlinkError::Config(format!("invalid number [{v}] in [{}]", path.display()))
      })
    })
    .collect()
}

/// Ids must run 0, 1, 2, ... with no gaps.
fn check_ids(ids: &[usize], what: &str) -> Result<()> {
  if ids.first() != Some(&0) {
    return Err(SimlinkError::Config(format!("{what} ids do not start at 0")));
  }
  for pair in ids.windows(2) {
    if pair[1] != pair[0] + 1 {
      return Err(SimlinkError::Config(format!(
        "{what} ids are not strictly incremental at {}",
        pair[1]
      )));
    }
  }
  Ok(())
}

#[cfg(test)]
#[path = "mesh_loader_test.rs"]
mod mesh_loader_test;
