//! Spatial elements and element sets.
//!
//! An element set is an ordered collection of elements sharing one geometric
//! type. Id-based sets carry no geometry and only answer id queries; the
//! other types expose per-index vertex and face accessors for the mapper and
//! the search tree.

use glam::{DVec2, DVec3};

use crate::error::{Result, SimlinkError};

/// The uniform geometric type of an element set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
  IdBased,
  Point,
  Polyline,
  Polygon,
  Polyhedron,
}

/// One spatial element: an id, ordered vertices and (for polyhedral use)
/// faces as vertex-index lists.
#[derive(Clone, Debug)]
pub struct Element {
  pub id: String,
  pub vertices: Vec<DVec3>,
  pub faces: Vec<Vec<usize>>,
}

impl Element {
  pub fn new(id: impl Into<String>, vertices: Vec<DVec3>) -> Self {
    Self {
      id: id.into(),
      vertices,
      faces: Vec::new(),
    }
  }

  /// An element carrying an id only.
  pub fn id_only(id: impl Into<String>) -> Self {
    Self::new(id, Vec::new())
  }
}

/// An ordered list of elements of one type.
#[derive(Clone, Debug)]
pub struct ElementSet {
  pub id: String,
  pub caption: String,
  pub description: String,
  element_type: ElementType,
  spatial_reference: String,
  version: u32,
  elements: Vec<Element>,
}

impl ElementSet {
  pub fn new(id: impl Into<String>, element_type: ElementType, elements: Vec<Element>) -> Self {
    Self {
      id: id.into(),
      caption: String::new(),
      description: String::new(),
      element_type,
      spatial_reference: String::new(),
      version: 0,
      elements,
    }
  }

  /// A point set from raw xy coordinates, ids `"0"`, `"1"`, ...
  pub fn points(id: impl Into<String>, coords: &[DVec2]) -> Self {
    let elements = coords
      .iter()
      .enumerate()
      .map(|(i, c)| Element::new(i.to_string(), vec![DVec3::new(c.x, c.y, 0.0)]))
      .collect();
    Self::new(id, ElementType::Point, elements)
  }

  /// A single-polygon set from xy vertices.
  pub fn polygon(id: impl Into<String>, vertices: &[DVec2]) -> Self {
    Self::polygons(id, &[vertices.to_vec()])
  }

  /// A polygon set, one element per vertex ring.
  pub fn polygons(id: impl Into<String>, rings: &[Vec<DVec2>]) -> Self {
    let elements = rings
      .iter()
      .enumerate()
      .map(|(i, ring)| {
        let vertices = ring.iter().map(|c| DVec3::new(c.x, c.y, 0.0)).collect();
        Element::new(i.to_string(), vertices)
      })
      .collect();
    Self::new(id, ElementType::Polygon, elements)
  }

  /// A polyline set, one element per vertex chain.
  pub fn polylines(id: impl Into<String>, chains: &[Vec<DVec2>]) -> Self {
    let elements = chains
      .iter()
      .enumerate()
      .map(|(i, chain)| {
        let vertices = chain.iter().map(|c| DVec3::new(c.x, c.y, 0.0)).collect();
        Element::new(i.to_string(), vertices)
      })
      .collect();
    Self::new(id, ElementType::Polyline, elements)
  }

  /// An id-based set with the given element ids.
  pub fn id_based(id: impl Into<String>, ids: &[&str]) -> Self {
    let elements = ids.iter().map(|eid| Element::id_only(*eid)).collect();
    Self::new(id, ElementType::IdBased, elements)
  }

  pub fn element_type(&self) -> ElementType {
    self.element_type
  }

  pub fn element_count(&self) -> usize {
    self.elements.len()
  }

  pub fn spatial_reference(&self) -> &str {
    &self.spatial_reference
  }

  pub fn set_spatial_reference(&mut self, srs: impl Into<String>) {
    self.spatial_reference = srs.into();
  }

  /// Version counter, bumped on any structural change.
  pub fn version(&self) -> u32 {
    self.version
  }

  pub fn elements(&self) -> &[Element] {
    &self.elements
  }

  pub fn add_element(&mut self, element: Element) {
    self.elements.push(element);
    self.version += 1;
  }

  fn element(&self, index: usize) -> Result<&Element> {
    self.elements.get(index).ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "element index {index} outside set [{}] of {} elements",
        self.id,
        self.elements.len()
      ))
    })
  }

  pub fn element_id(&self, index: usize) -> Result<&str> {
    Ok(&self.element(index)?.id)
  }

  fn check_geometric(&self) -> Result<()> {
    if self.element_type == ElementType::IdBased {
      return Err(SimlinkError::ContractViolation(format!(
        "geometry query on id-based element set [{}]",
        self.id
      )));
    }
    Ok(())
  }

  pub fn vertex_count(&self, index: usize) -> Result<usize> {
    self.check_geometric()?;
    Ok(self.element(index)?.vertices.len())
  }

  pub fn face_count(&self, index: usize) -> Result<usize> {
    self.check_geometric()?;
    Ok(self.element(index)?.faces.len())
  }

  pub fn face_vertex_indices(&self, index: usize, face: usize) -> Result<&[usize]> {
    self.check_geometric()?;
    let element = self.element(index)?;
    element.faces.get(face).map(Vec::as_slice).ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "face index {face} outside element [{}] of {} faces",
        element.id,
        element.faces.len()
      ))
    })
  }

  pub fn vertex(&self, index: usize, vertex: usize) -> Result<DVec3> {
    self.check_geometric()?;
    let element = self.element(index)?;
    element.vertices.get(vertex).copied().ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "vertex index {vertex} outside element [{}] of {} vertices",
        element.id,
        element.vertices.len()
      ))
    })
  }

  /// The xy projection of one element's vertices.
  pub fn xy_vertices(&self, index: usize) -> Result<Vec<DVec2>> {
    self.check_geometric()?;
    Ok(
      self
        .element(index)?
        .vertices
        .iter()
        .map(|v| DVec2::new(v.x, v.y))
        .collect(),
    )
  }

  /// The single xy vertex of a point element.
  pub fn xy_point(&self, index: usize) -> Result<DVec2> {
    if self.element_type != ElementType::Point {
      return Err(SimlinkError::ContractViolation(format!(
        "point query on {:?} element set [{}]",
        self.element_type, self.id
      )));
    }
    let v = self.vertex(index, 0)?;
    Ok(DVec2::new(v.x, v.y))
  }
}

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;
