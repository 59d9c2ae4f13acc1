//! Axis-aligned rectangle arithmetic for the search tree.

use glam::DVec2;

/// An axis-aligned 2-D extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeomExtent {
  pub x_min: f64,
  pub x_max: f64,
  pub y_min: f64,
  pub y_max: f64,
}

impl GeomExtent {
  /// An inverted extent ready for encapsulation.
  pub fn empty() -> Self {
    Self {
      x_min: f64::INFINITY,
      x_max: f64::NEG_INFINITY,
      y_min: f64::INFINITY,
      y_max: f64::NEG_INFINITY,
    }
  }

  pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
    Self {
      x_min,
      x_max,
      y_min,
      y_max,
    }
  }

  /// The bounding extent of a point cloud.
  pub fn from_points(points: &[DVec2]) -> Self {
    let mut extent = Self::empty();
    for point in points {
      extent.update_point(*point);
    }
    extent
  }

  /// A square extent of half-width `adjacent` around one point.
  pub fn around_point(point: DVec2, adjacent: f64) -> Self {
    let adjacent = adjacent.max(super::EPSILON);
    Self {
      x_min: point.x - adjacent,
      x_max: point.x + adjacent,
      y_min: point.y - adjacent,
      y_max: point.y + adjacent,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.x_min <= self.x_max && self.y_min <= self.y_max
  }

  /// Closed containment test.
  pub fn contains_point(&self, point: DVec2) -> bool {
    point.x >= self.x_min && point.x <= self.x_max && point.y >= self.y_min && point.y <= self.y_max
  }

  /// Strict interior overlap; extents that only share a border do not overlap.
  pub fn overlaps(&self, other: &GeomExtent) -> bool {
    self.x_max > other.x_min
      && self.x_min < other.x_max
      && self.y_max > other.y_min
      && self.y_min < other.y_max
  }

  /// Grow to include a point.
  pub fn update_point(&mut self, point: DVec2) {
    self.x_min = self.x_min.min(point.x);
    self.x_max = self.x_max.max(point.x);
    self.y_min = self.y_min.min(point.y);
    self.y_max = self.y_max.max(point.y);
  }

  /// Grow to include another extent.
  pub fn update(&mut self, other: &GeomExtent) {
    self.x_min = self.x_min.min(other.x_min);
    self.x_max = self.x_max.max(other.x_max);
    self.y_min = self.y_min.min(other.y_min);
    self.y_max = self.y_max.max(other.y_max);
  }
}

impl Default for GeomExtent {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "extent_test.rs"]
mod extent_test;
