//! Quadtree index over element extents.
//!
//! The tree is built in two phases. First, vertex coordinates are inserted
//! one at a time; a node splits into four equal quadrants once it holds more
//! than [`MAX_POINTS_PER_NODE`] points. Second, elements are inserted keyed
//! by their extent into every leaf their extent overlaps. Once any element
//! has been added the point structure is frozen.
//!
//! Queries return the union of the element sets of all overlapping leaves,
//! without duplicates.

use glam::DVec2;

use crate::element::ElementSet;
use crate::error::{Result, SimlinkError};
use crate::geometry::GeomExtent;

/// Points a node may hold before it subdivides.
pub const MAX_POINTS_PER_NODE: usize = 10;

#[derive(Clone, Debug)]
struct ElementLeaf<T> {
  element: T,
  extent: GeomExtent,
}

#[derive(Clone, Debug)]
struct TreeNode<T> {
  extent: GeomExtent,
  /// Empty, or exactly four children in (NE, NW, SW, SE) order.
  children: Vec<TreeNode<T>>,
  points: Vec<DVec2>,
  elements: Vec<ElementLeaf<T>>,
}

impl<T: Clone + PartialEq> TreeNode<T> {
  fn new(extent: GeomExtent) -> Self {
    Self {
      extent,
      children: Vec::new(),
      points: Vec::new(),
      elements: Vec::new(),
    }
  }

  fn has_children(&self) -> bool {
    !self.children.is_empty()
  }

  fn add_point(&mut self, point: DVec2) -> bool {
    if !self.extent.contains_point(point) {
      return false;
    }

    if self.has_children() {
      let quadrant = self.quadrant_of(point);
      return self.children[quadrant].add_point(point);
    }

    // Exact duplicates are silently dropped.
    if self.points.iter().any(|p| p.x == point.x && p.y == point.y) {
      return false;
    }

    self.points.push(point);
    if self.points.len() > MAX_POINTS_PER_NODE {
      self.subdivide();
    }

    true
  }

  /// Quadrant index for a point; border ties go to the upper-right child.
  fn quadrant_of(&self, point: DVec2) -> usize {
    let x_mid = 0.5 * (self.extent.x_min + self.extent.x_max);
    let y_mid = 0.5 * (self.extent.y_min + self.extent.y_max);

    match (point.x >= x_mid, point.y >= y_mid) {
      (true, true) => 0,   // NE
      (false, true) => 1,  // NW
      (false, false) => 2, // SW
      (true, false) => 3,  // SE
    }
  }

  fn subdivide(&mut self) {
    let x_mid = 0.5 * (self.extent.x_min + self.extent.x_max);
    let y_mid = 0.5 * (self.extent.y_min + self.extent.y_max);

    self.children = vec![
      TreeNode::new(GeomExtent::new(x_mid, self.extent.x_max, y_mid, self.extent.y_max)),
      TreeNode::new(GeomExtent::new(self.extent.x_min, x_mid, y_mid, self.extent.y_max)),
      TreeNode::new(GeomExtent::new(self.extent.x_min, x_mid, self.extent.y_min, y_mid)),
      TreeNode::new(GeomExtent::new(x_mid, self.extent.x_max, self.extent.y_min, y_mid)),
    ];

    for point in std::mem::take(&mut self.points) {
      let quadrant = self.quadrant_of(point);
      self.children[quadrant].add_point(point);
    }
  }

  fn add_element(&mut self, leaf: &ElementLeaf<T>) {
    if !self.extent.overlaps(&leaf.extent) {
      return;
    }

    if self.has_children() {
      for child in &mut self.children {
        child.add_element(leaf);
      }
    } else {
      self.elements.push(leaf.clone());
    }
  }

  fn find_elements(&self, extent: &GeomExtent, out: &mut Vec<T>) {
    if !self.extent.overlaps(extent) {
      return;
    }

    if self.has_children() {
      for child in &self.children {
        child.find_elements(extent, out);
      }
    } else {
      for leaf in &self.elements {
        if leaf.extent.overlaps(extent) && !out.contains(&leaf.element) {
          out.push(leaf.element.clone());
        }
      }
    }
  }

  fn depth(&self) -> usize {
    1 + self
      .children
      .iter()
      .map(TreeNode::depth)
      .max()
      .unwrap_or(0)
  }

  fn leaf_count(&self) -> usize {
    if !self.has_children() {
      return 1;
    }
    self.children.iter().map(TreeNode::leaf_count).sum()
  }

  fn max_elements_per_leaf(&self) -> usize {
    if !self.has_children() {
      return self.elements.len();
    }
    self
      .children
      .iter()
      .map(TreeNode::max_elements_per_leaf)
      .max()
      .unwrap_or(0)
  }
}

/// A 2-D search tree over element extents.
#[derive(Clone, Debug)]
pub struct ElementSearchTree<T> {
  head: TreeNode<T>,
  num_points: usize,
  num_elements: usize,
}

impl<T: Clone + PartialEq> ElementSearchTree<T> {
  /// An empty tree covering `extent`.
  pub fn new(extent: GeomExtent) -> Self {
    Self {
      head: TreeNode::new(extent),
      num_points: 0,
      num_elements: 0,
    }
  }

  /// Insert a vertex coordinate, growing the point structure.
  ///
  /// Fails once any element has been added; the subdivision must be frozen
  /// before elements are distributed over leaves.
  pub fn add_point(&mut self, point: DVec2) -> Result<()> {
    if self.num_elements > 0 {
      return Err(SimlinkError::ContractViolation(
        "cannot add points to a search tree that already holds elements".into(),
      ));
    }

    if self.head.add_point(point) {
      self.num_points += 1;
    }
    Ok(())
  }

  /// Insert an element keyed by its extent.
  pub fn add_element(&mut self, element: T, extent: GeomExtent) {
    let leaf = ElementLeaf { element, extent };
    self.head.add_element(&leaf);
    self.num_elements += 1;
  }

  /// All elements whose extent overlaps `extent`, without duplicates.
  pub fn find_elements(&self, extent: &GeomExtent) -> Vec<T> {
    let mut out = Vec::new();
    self.head.find_elements(extent, &mut out);
    out
  }

  pub fn point_count(&self) -> usize {
    self.num_points
  }

  pub fn element_count(&self) -> usize {
    self.num_elements
  }

  // Diagnostics.

  pub fn depth(&self) -> usize {
    self.head.depth()
  }

  pub fn leaf_count(&self) -> usize {
    self.head.leaf_count()
  }

  pub fn max_elements_per_leaf(&self) -> usize {
    self.head.max_elements_per_leaf()
  }
}

/// Build a search tree of element indices from an element set.
///
/// All vertex coordinates seed the point phase; each element is then inserted
/// with its own bounding extent.
pub fn build_search_tree(set: &ElementSet) -> Result<ElementSearchTree<usize>> {
  let mut extent = GeomExtent::empty();
  for index in 0..set.element_count() {
    for vertex in set.xy_vertices(index)? {
      extent.update_point(vertex);
    }
  }

  let mut tree = ElementSearchTree::new(extent);
  for index in 0..set.element_count() {
    for vertex in set.xy_vertices(index)? {
      tree.add_point(vertex)?;
    }
  }

  for index in 0..set.element_count() {
    let mut element_extent = GeomExtent::from_points(&set.xy_vertices(index)?);

    // Point and axis-aligned degenerate extents would never pass the strict
    // overlap test; give them a minimal footprint.
    if element_extent.x_max - element_extent.x_min < crate::geometry::EPSILON {
      element_extent.x_min -= crate::geometry::EPSILON;
      element_extent.x_max += crate::geometry::EPSILON;
    }
    if element_extent.y_max - element_extent.y_min < crate::geometry::EPSILON {
      element_extent.y_min -= crate::geometry::EPSILON;
      element_extent.y_max += crate::geometry::EPSILON;
    }

    tree.add_element(index, element_extent);
  }

  Ok(tree)
}

#[cfg(test)]
#[path = "search_tree_test.rs"]
mod search_tree_test;
