//! Mesh topology for the numeric kernel.
//!
//! Three parallel indexed collections of nodes, faces and cells. The loader
//! (or a test fixture) provides coordinates plus face-node and cell-face
//! lists; everything else (adjacency, ordering, normals, measures) is
//! derived by [`grid::Grid::activate`].

pub mod calculator;
pub mod grid;

#[cfg(test)]
pub mod test_fixtures;

pub use grid::Grid;

use glam::DVec3;
use smallvec::SmallVec;

/// A mesh vertex with back-references to incident faces and cells.
#[derive(Clone, Debug, Default)]
pub struct Node {
  pub coordinate: DVec3,
  pub face_indexes: Vec<usize>,
  pub cell_indexes: Vec<usize>,
}

impl Node {
  pub fn new(coordinate: DVec3) -> Self {
    Self {
      coordinate,
      face_indexes: Vec::new(),
      cell_indexes: Vec::new(),
    }
  }
}

/// A face: two nodes in a 2-D mesh, a polygon of nodes in 3-D.
///
/// After activation the node list is ordered counter-clockwise about the
/// unit normal, `cell_indexes` holds the one or two adjacent cells, and
/// `cell_sides` carries `+1`/`-1` per adjacent cell telling whether that
/// cell's outward direction agrees with the stored normal.
#[derive(Clone, Debug, Default)]
pub struct Face {
  pub centroid: DVec3,
  pub normal: DVec3,
  /// Area in 3-D; edge length in 2-D.
  pub area: f64,
  pub perimeter: f64,
  pub node_indexes: Vec<usize>,
  /// One entry for boundary faces, two for interior faces.
  pub cell_indexes: SmallVec<[usize; 2]>,
  pub cell_sides: SmallVec<[i8; 2]>,
}

impl Face {
  pub fn new(centroid: DVec3, node_indexes: Vec<usize>) -> Self {
    Self {
      centroid,
      normal: DVec3::ZERO,
      area: f64::NAN,
      perimeter: f64::NAN,
      node_indexes,
      cell_indexes: SmallVec::new(),
      cell_sides: SmallVec::new(),
    }
  }

  /// A face incident to exactly one cell.
  pub fn is_boundary(&self) -> bool {
    self.cell_indexes.len() == 1
  }
}

/// A cell: a polygon of faces in 2-D, a polyhedron in 3-D.
#[derive(Clone, Debug, Default)]
pub struct Cell {
  pub centroid: DVec3,
  /// Sum of incident face areas.
  pub surface: f64,
  /// Volume in 3-D; polygon area in 2-D.
  pub volume: f64,
  pub face_indexes: Vec<usize>,
  pub neighbors: Vec<usize>,
}

impl Cell {
  pub fn new(centroid: DVec3, face_indexes: Vec<usize>) -> Self {
    Self {
      centroid,
      surface: f64::NAN,
      volume: f64::NAN,
      face_indexes,
      neighbors: Vec::new(),
    }
  }
}

/// Raw mesh topology, index-parallel across the three collections.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
  pub nodes: Vec<Node>,
  pub faces: Vec<Face>,
  pub cells: Vec<Cell>,
}

impl Mesh {
  pub fn new(nodes: Vec<Node>, faces: Vec<Face>, cells: Vec<Cell>) -> Self {
    Self { nodes, faces, cells }
  }
}
