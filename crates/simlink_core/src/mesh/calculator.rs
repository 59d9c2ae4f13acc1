//! Mesh geometry derivations.
//!
//! Pure functions over a [`Mesh`]; `Grid::activate` orchestrates them. A
//! mesh counts as 2-D when any face has exactly two nodes.

use std::collections::BTreeSet;

use glam::DVec3;

use crate::error::{Result, SimlinkError};

use super::Mesh;

/// All node indices of a cell, collected through its faces.
pub fn cell_node_indexes(cell_index: usize, mesh: &Mesh) -> Vec<usize> {
  let mut indexes = BTreeSet::new();
  for &face_index in &mesh.cells[cell_index].face_indexes {
    indexes.extend(mesh.faces[face_index].node_indexes.iter().copied());
  }
  indexes.into_iter().collect()
}

/// True when some face has exactly two nodes.
pub fn is_2d_mesh(mesh: &Mesh) -> bool {
  mesh.faces.iter().any(|face| face.node_indexes.len() == 2)
}

/// Arithmetic mean of a node set.
pub fn centroid_of(node_indexes: &[usize], mesh: &Mesh) -> DVec3 {
  if node_indexes.is_empty() {
    return DVec3::ZERO;
  }
  let sum: DVec3 = node_indexes
    .iter()
    .map(|&i| mesh.nodes[i].coordinate)
    .sum();
  sum / node_indexes.len() as f64
}

/// Unit normal of a face.
///
/// In 2-D the normal is the edge vector rotated a quarter turn; in 3-D it
/// comes from the cross product of the first three vertices, whose
/// orientation decides the direction.
pub fn face_normal(face_index: usize, mesh: &Mesh) -> Result<DVec3> {
  let nodes = &mesh.faces[face_index].node_indexes;
  if nodes.len() < 2 {
    return Err(SimlinkError::ContractViolation(format!(
      "face {face_index} has fewer than two nodes"
    )));
  }

  if is_2d_mesh(mesh) {
    let edge = mesh.nodes[nodes[1]].coordinate - mesh.nodes[nodes[0]].coordinate;
    let normal = DVec3::new(-edge.y, edge.x, 0.0);
    return Ok(normal.normalize());
  }

  let v1 = mesh.nodes[nodes[0]].coordinate - mesh.nodes[nodes[1]].coordinate;
  let v2 = mesh.nodes[nodes[2]].coordinate - mesh.nodes[nodes[1]].coordinate;
  Ok(v1.cross(v2).normalize())
}

/// Node list re-sorted counter-clockwise about the face normal.
pub fn sort_face_nodes(face_index: usize, mesh: &Mesh) -> Result<Vec<usize>> {
  let face = &mesh.faces[face_index];
  let mut sorted = face.node_indexes.clone();
  if sorted.len() <= 2 {
    return Ok(sorted);
  }

  let normal = if face.normal.length_squared() > 0.0 {
    face.normal
  } else {
    face_normal(face_index, mesh)?
  };
  let origin = centroid_of(&face.node_indexes, mesh);

  // Pairwise swap so consecutive spokes always turn counter-clockwise.
  let spoke = |idx: usize| mesh.nodes[idx].coordinate - origin;
  for i in 0..sorted.len() - 1 {
    for j in i + 1..sorted.len() {
      if spoke(sorted[i]).cross(spoke(sorted[j])).dot(normal) > 0.0 {
        sorted.swap(i, j);
      }
    }
  }

  Ok(sorted)
}

/// Perimeter of a face: open polyline length in 2-D, closed ring in 3-D.
pub fn face_perimeter(face_index: usize, mesh: &Mesh) -> f64 {
  let nodes = &mesh.faces[face_index].node_indexes;
  let n = nodes.len();

  let mut length = 0.0;
  for i in 0..n - 1 {
    length += mesh.nodes[nodes[i]]
      .coordinate
      .distance(mesh.nodes[nodes[i + 1]].coordinate);
  }
  if !is_2d_mesh(mesh) {
    length += mesh.nodes[nodes[n - 1]]
      .coordinate
      .distance(mesh.nodes[nodes[0]].coordinate);
  }
  length
}

/// Face area: edge length in 2-D, projected shoelace area in 3-D.
pub fn face_area(face_index: usize, mesh: &Mesh) -> Result<f64> {
  if is_2d_mesh(mesh) {
    return Ok(face_perimeter(face_index, mesh));
  }

  let face = &mesh.faces[face_index];
  let normal = if face.normal.length_squared() > 0.0 {
    face.normal
  } else {
    face_normal(face_index, mesh)?
  };

  // Shoelace in 3-D, projected through the normal components.
  let nodes = &face.node_indexes;
  let mut area = 0.0;
  for i in 0..nodes.len() {
    let c0 = mesh.nodes[nodes[i]].coordinate;
    let c1 = mesh.nodes[nodes[(i + 1) % nodes.len()]].coordinate;
    area += normal.z * (c0.x * c1.y - c0.y * c1.x);
    area += normal.x * (c0.y * c1.z - c0.z * c1.y);
    area += normal.y * (c0.z * c1.x - c0.x * c1.z);
  }
  Ok(area.abs() / 2.0)
}

/// Cell surface: sum of its face areas.
pub fn cell_surface_area(cell_index: usize, mesh: &Mesh) -> Result<f64> {
  let mut area = 0.0;
  for &face_index in &mesh.cells[cell_index].face_indexes {
    let value = mesh.faces[face_index].area;
    area += if value.is_nan() {
      face_area(face_index, mesh)?
    } else {
      value
    };
  }
  Ok(area)
}

/// Cell volume: the polygon area in 2-D, a tetrahedron fan for four-node
/// cells in 3-D, not implemented otherwise.
pub fn cell_volume(cell_index: usize, mesh: &Mesh) -> Result<f64> {
  let node_indexes = cell_node_indexes(cell_index, mesh);

  if is_2d_mesh(mesh) {
    return Ok(cell_polygon_area(&node_indexes, mesh));
  }

  if node_indexes.len() == 4 {
    let origin = mesh.nodes[node_indexes[0]].coordinate;
    let v1 = mesh.nodes[node_indexes[1]].coordinate - origin;
    let v2 = mesh.nodes[node_indexes[2]].coordinate - origin;
    let v3 = mesh.nodes[node_indexes[3]].coordinate - origin;
    return Ok((v1.cross(v2).dot(v3) / 6.0).abs());
  }

  Err(SimlinkError::NotImplemented(format!(
    "volume of a 3-D cell with {} nodes",
    node_indexes.len()
  )))
}

/// Shoelace area of a 2-D cell's node ring, ordered by angle about the
/// centroid.
fn cell_polygon_area(node_indexes: &[usize], mesh: &Mesh) -> f64 {
  let center = centroid_of(node_indexes, mesh);

  let mut ring: Vec<DVec3> = node_indexes
    .iter()
    .map(|&i| mesh.nodes[i].coordinate)
    .collect();
  ring.sort_by(|a, b| {
    let angle_a = (a.y - center.y).atan2(a.x - center.x);
    let angle_b = (b.y - center.y).atan2(b.x - center.x);
    angle_a.total_cmp(&angle_b)
  });

  let mut area = 0.0;
  for i in 0..ring.len() {
    let a = ring[i];
    let b = ring[(i + 1) % ring.len()];
    area += a.x * b.y - b.x * a.y;
  }
  (area / 2.0).abs()
}

/// Indices of all boundary faces.
pub fn boundary_face_indexes(mesh: &Mesh) -> Vec<usize> {
  mesh
    .faces
    .iter()
    .enumerate()
    .filter(|(_, face)| face.is_boundary())
    .map(|(i, _)| i)
    .collect()
}

/// Indices of all cells touching a boundary face.
pub fn boundary_cell_indexes(mesh: &Mesh) -> Vec<usize> {
  mesh
    .cells
    .iter()
    .enumerate()
    .filter(|(_, cell)| cell.face_indexes.len() > cell.neighbors.len())
    .map(|(i, _)| i)
    .collect()
}

#[cfg(test)]
#[path = "calculator_test.rs"]
mod calculator_test;
