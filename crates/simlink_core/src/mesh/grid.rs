//! Grid activation: from raw topology to a computable mesh.

use std::collections::HashMap;

use glam::DVec3;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Result, SimlinkError};

use super::calculator;
use super::{Cell, Face, Mesh, Node};

/// A mesh with derived topology, ready for the operator factory.
///
/// `activate` performs the derivation steps in order: incidence lists, cell
/// adjacency, node ordering, normals, measures and the final consistency
/// check. Per-entity computations with no cross-iteration dependency run
/// data-parallel.
#[derive(Clone, Debug, Default)]
pub struct Grid {
  mesh: Mesh,
  version: u32,
  patches: HashMap<String, Vec<usize>>,
  zones: HashMap<String, Vec<usize>>,
}

impl Grid {
  pub fn new(mesh: Mesh) -> Self {
    Self {
      mesh,
      version: 0,
      patches: HashMap::new(),
      zones: HashMap::new(),
    }
  }

  /// Build the raw mesh from coordinate and index maps keyed by the dense
  /// ids the loaders guarantee.
  pub fn from_maps(
    node_coords: &HashMap<usize, DVec3>,
    face_coords: &HashMap<usize, DVec3>,
    cell_coords: &HashMap<usize, DVec3>,
    face_nodes: &HashMap<usize, Vec<usize>>,
    cell_faces: &HashMap<usize, Vec<usize>>,
  ) -> Result<Self> {
    let mut nodes = vec![Node::default(); node_coords.len()];
    for (&id, &coordinate) in node_coords {
      *nodes.get_mut(id).ok_or_else(|| bad_id("node", id))? = Node::new(coordinate);
    }

    let mut faces = vec![Face::default(); face_coords.len()];
    for (&id, &centroid) in face_coords {
      let node_indexes = face_nodes.get(&id).ok_or_else(|| bad_id("face", id))?;
      *faces.get_mut(id).ok_or_else(|| bad_id("face", id))? =
        Face::new(centroid, node_indexes.clone());
    }

    let mut cells = vec![Cell::default(); cell_coords.len()];
    for (&id, &centroid) in cell_coords {
      let face_indexes = cell_faces.get(&id).ok_or_else(|| bad_id("cell", id))?;
      *cells.get_mut(id).ok_or_else(|| bad_id("cell", id))? =
        Cell::new(centroid, face_indexes.clone());
    }

    Ok(Self::new(Mesh::new(nodes, faces, cells)))
  }

  pub fn mesh(&self) -> &Mesh {
    &self.mesh
  }

  pub fn version(&self) -> u32 {
    self.version
  }

  pub fn num_nodes(&self) -> usize {
    self.mesh.nodes.len()
  }

  pub fn num_faces(&self) -> usize {
    self.mesh.faces.len()
  }

  pub fn num_cells(&self) -> usize {
    self.mesh.cells.len()
  }

  pub fn node(&self, index: usize) -> &Node {
    &self.mesh.nodes[index]
  }

  pub fn face(&self, index: usize) -> &Face {
    &self.mesh.faces[index]
  }

  pub fn cell(&self, index: usize) -> &Cell {
    &self.mesh.cells[index]
  }

  pub fn boundary_faces(&self) -> Vec<usize> {
    calculator::boundary_face_indexes(&self.mesh)
  }

  pub fn set_patches(&mut self, patches: HashMap<String, Vec<usize>>) {
    self.patches = patches;
  }

  pub fn patches(&self) -> &HashMap<String, Vec<usize>> {
    &self.patches
  }

  pub fn set_zones(&mut self, zones: HashMap<String, Vec<usize>>) {
    self.zones = zones;
  }

  pub fn zones(&self) -> &HashMap<String, Vec<usize>> {
    &self.zones
  }

  /// Distance from a cell centroid to one of its face centroids.
  pub fn cell_to_face_distance(&self, cell_index: usize, face_index: usize) -> f64 {
    self.mesh.cells[cell_index]
      .centroid
      .distance(self.mesh.faces[face_index].centroid)
  }

  // Adaptive refinement hooks for grids that support it.

  pub fn refine_cell(&mut self, _cell_index: usize) -> Result<()> {
    Err(SimlinkError::NotImplemented("grid cell refinement".into()))
  }

  pub fn relax_cell(&mut self, _cell_index: usize) -> Result<()> {
    Err(SimlinkError::NotImplemented("grid cell relaxation".into()))
  }

  /// Derive the full topology and geometry, then check mesh consistency.
  pub fn activate(&mut self) -> Result<()> {
    self.collect_node_incidence();
    self.collect_face_cells();
    self.collect_cell_neighbors();

    self.calculate_face_normals()?;
    self.sort_face_nodes()?;
    self.collect_face_cell_sides();

    self.calculate_face_measures()?;
    self.calculate_cell_measures()?;

    self.check_mesh()?;
    self.version += 1;

    debug!(
      nodes = self.num_nodes(),
      faces = self.num_faces(),
      cells = self.num_cells(),
      boundary_faces = self.boundary_faces().len(),
      "grid activated"
    );
    Ok(())
  }

  /// Step 1: per-node lists of incident faces and cells.
  fn collect_node_incidence(&mut self) {
    for node in &mut self.mesh.nodes {
      node.face_indexes.clear();
      node.cell_indexes.clear();
    }

    for face_index in 0..self.mesh.faces.len() {
      for node_index in self.mesh.faces[face_index].node_indexes.clone() {
        self.mesh.nodes[node_index].face_indexes.push(face_index);
      }
    }
    for cell_index in 0..self.mesh.cells.len() {
      for node_index in calculator::cell_node_indexes(cell_index, &self.mesh) {
        self.mesh.nodes[node_index].cell_indexes.push(cell_index);
      }
    }
  }

  /// Step 2: per-face adjacent cells (one for boundary, two for interior).
  fn collect_face_cells(&mut self) {
    for face in &mut self.mesh.faces {
      face.cell_indexes.clear();
    }
    for cell_index in 0..self.mesh.cells.len() {
      for face_index in self.mesh.cells[cell_index].face_indexes.clone() {
        self.mesh.faces[face_index].cell_indexes.push(cell_index);
      }
    }
  }

  /// Step 3: per-cell neighbor cells across shared interior faces.
  fn collect_cell_neighbors(&mut self) {
    for cell in &mut self.mesh.cells {
      cell.neighbors.clear();
    }
    for face_index in 0..self.mesh.faces.len() {
      let cells = self.mesh.faces[face_index].cell_indexes.clone();
      if cells.len() != 2 {
        continue;
      }
      self.mesh.cells[cells[0]].neighbors.push(cells[1]);
      self.mesh.cells[cells[1]].neighbors.push(cells[0]);
    }
  }

  /// Step 4a: unit normals.
  fn calculate_face_normals(&mut self) -> Result<()> {
    let normals: Vec<DVec3> = (0..self.mesh.faces.len())
      .into_par_iter()
      .map(|i| calculator::face_normal(i, &self.mesh))
      .collect::<Result<_>>()?;
    for (face, normal) in self.mesh.faces.iter_mut().zip(normals) {
      face.normal = normal;
    }
    Ok(())
  }

  /// Step 4b: node lists counter-clockwise about the normal.
  fn sort_face_nodes(&mut self) -> Result<()> {
    let sorted: Vec<Vec<usize>> = (0..self.mesh.faces.len())
      .into_par_iter()
      .map(|i| calculator::sort_face_nodes(i, &self.mesh))
      .collect::<Result<_>>()?;
    for (face, node_indexes) in self.mesh.faces.iter_mut().zip(sorted) {
      face.node_indexes = node_indexes;
    }
    Ok(())
  }

  /// Step 5: orientation of each face relative to its adjacent cells.
  fn collect_face_cell_sides(&mut self) {
    let sides: Vec<SmallVec<[i8; 2]>> = (0..self.mesh.faces.len())
      .into_par_iter()
      .map(|face_index| {
        let face = &self.mesh.faces[face_index];
        let toward_first =
          self.mesh.cells[face.cell_indexes[0]].centroid - face.centroid;
        // Positive when the normal points away from the first cell.
        let first: i8 = if toward_first.dot(face.normal) < 0.0 { 1 } else { -1 };
        if face.cell_indexes.len() == 2 {
          SmallVec::from_slice(&[first, -first])
        } else {
          SmallVec::from_slice(&[first])
        }
      })
      .collect();
    for (face, side) in self.mesh.faces.iter_mut().zip(sides) {
      face.cell_sides = side;
    }
  }

  /// Step 6: face areas and perimeters.
  fn calculate_face_measures(&mut self) -> Result<()> {
    let measures: Vec<(f64, f64)> = (0..self.mesh.faces.len())
      .into_par_iter()
      .map(|i| {
        let perimeter = calculator::face_perimeter(i, &self.mesh);
        let area = calculator::face_area(i, &self.mesh)?;
        Ok((area, perimeter))
      })
      .collect::<Result<_>>()?;
    for (face, (area, perimeter)) in self.mesh.faces.iter_mut().zip(measures) {
      face.area = area;
      face.perimeter = perimeter;
    }
    Ok(())
  }

  /// Steps 7 and 8: cell volumes and surface areas.
  fn calculate_cell_measures(&mut self) -> Result<()> {
    let measures: Vec<(f64, f64)> = (0..self.mesh.cells.len())
      .into_par_iter()
      .map(|i| {
        let surface = calculator::cell_surface_area(i, &self.mesh)?;
        let volume = calculator::cell_volume(i, &self.mesh)?;
        Ok((surface, volume))
      })
      .collect::<Result<_>>()?;
    for (cell, (surface, volume)) in self.mesh.cells.iter_mut().zip(measures) {
      cell.surface = surface;
      cell.volume = volume;
    }
    Ok(())
  }

  /// Consistency invariants that must hold after activation.
  fn check_mesh(&self) -> Result<()> {
    for (i, face) in self.mesh.faces.iter().enumerate() {
      if face.cell_indexes.is_empty() || face.cell_indexes.len() > 2 {
        return Err(SimlinkError::ContractViolation(format!(
          "face {i} is adjacent to {} cells",
          face.cell_indexes.len()
        )));
      }
      if face.cell_indexes.len() == 2 && face.cell_sides[0] == face.cell_sides[1] {
        return Err(SimlinkError::ContractViolation(format!(
          "interior face {i} has equal orientations on both sides"
        )));
      }
      if !(face.area > 0.0) {
        return Err(SimlinkError::ContractViolation(format!(
          "face {i} has non-positive area {}",
          face.area
        )));
      }
    }

    for (i, cell) in self.mesh.cells.iter().enumerate() {
      if !(cell.volume > 0.0) {
        return Err(SimlinkError::ContractViolation(format!(
          "cell {i} has non-positive volume {}",
          cell.volume
        )));
      }

      // Neighbors must equal the opposite cells across this cell's faces.
      let mut expected: Vec<usize> = cell
        .face_indexes
        .iter()
        .flat_map(|&f| {
          self.mesh.faces[f]
            .cell_indexes
            .iter()
            .copied()
            .filter(move |&c| c != i)
        })
        .collect();
      expected.sort_unstable();
      let mut actual = cell.neighbors.clone();
      actual.sort_unstable();
      if expected != actual {
        return Err(SimlinkError::ContractViolation(format!(
          "cell {i} neighbor list is inconsistent with its faces"
        )));
      }
    }

    Ok(())
  }
}

fn bad_id(what: &str, id: usize) -> SimlinkError {
  SimlinkError::Config(format!("{what} id {id} is outside the dense id range"))
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
