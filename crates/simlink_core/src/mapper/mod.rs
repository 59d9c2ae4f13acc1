//! Spatial element mapper.
//!
//! Builds a sparse `rows x cols` mapping matrix translating per-element
//! values from a source element set onto a target element set under a named
//! method, then applies it one time step at a time. Matrix rows are
//! independent by construction, so the fill is data-parallel over target
//! elements.

pub mod checker;

use glam::DVec2;
use rayon::prelude::*;
use tracing::debug;

use crate::element::{ElementSet, ElementType};
use crate::error::{Result, SimlinkError};
use crate::geometry::{self, GeomExtent};
use crate::numeric::SparseMatrix;
use crate::search_tree::{build_search_tree, ElementSearchTree};
use crate::values::ValueSet2D;

pub use checker::check_element_set;

/// The named mapping methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapMethod {
  Nearest,
  Inverse,
  Mean,
  Sum,
  WeightedMean,
  WeightedSum,
  Distribute,
  Value,
}

impl MapMethod {
  /// Look a method up by its configuration name.
  pub fn from_name(name: &str) -> Result<Self> {
    match name {
      "Nearest" => Ok(Self::Nearest),
      "Inverse" => Ok(Self::Inverse),
      "Mean" => Ok(Self::Mean),
      "Sum" => Ok(Self::Sum),
      "WeightedMean" => Ok(Self::WeightedMean),
      "WeightedSum" => Ok(Self::WeightedSum),
      "Distribute" => Ok(Self::Distribute),
      "Value" => Ok(Self::Value),
      other => Err(SimlinkError::mapping_plain(format!(
        "unknown mapping method [{other}]"
      ))),
    }
  }
}

/// Source/target element counts above which polygon mappings consult a
/// search tree instead of scanning every column.
const SEARCH_TREE_THRESHOLD: usize = 10;

/// Builds and applies the sparse source-to-target mapping matrix.
#[derive(Clone, Debug, Default)]
pub struct ElementMapper {
  matrix: SparseMatrix,
  rows: usize,
  cols: usize,
  method: Option<MapMethod>,
  initialized: bool,
}

impl ElementMapper {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  pub fn method(&self) -> Option<MapMethod> {
    self.method
  }

  pub fn matrix(&self) -> &SparseMatrix {
    &self.matrix
  }

  /// Validate both element sets, allocate the matrix and fill it according
  /// to the `(from, to)` element type pair.
  pub fn initialize(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    check_element_set(from).map_err(|e| SimlinkError::mapping("invalid source element set", e))?;
    check_element_set(to).map_err(|e| SimlinkError::mapping("invalid target element set", e))?;

    self.method = Some(method);
    self.cols = from.element_count();
    self.rows = to.element_count();
    self.matrix = SparseMatrix::new(self.rows, self.cols);
    self.initialized = false;

    match (from.element_type(), to.element_type()) {
      (ElementType::Point, ElementType::Point) => {
        let targets = collect_points(to)?;
        let sources = collect_points(from)?;
        self.fill_distance_rows(method, &sources, &targets, |s, t| geometry::distance(*t, *s))?;
      }
      (ElementType::Point, ElementType::Polyline) => {
        let targets = collect_vertex_lists(to)?;
        let sources = collect_points(from)?;
        self.fill_distance_rows(method, &sources, &targets, |s, t| {
          geometry::point_to_polyline_distance(t, *s)
        })?;
      }
      (ElementType::Point, ElementType::Polygon) => {
        self.fill_point_to_polygon(method, from, to)?;
      }
      (ElementType::Polyline, ElementType::Point) => {
        let targets = collect_points(to)?;
        let sources = collect_vertex_lists(from)?;
        self.fill_distance_rows(method, &sources, &targets, |s, t| {
          geometry::point_to_polyline_distance(s, *t)
        })?;
      }
      (ElementType::Polyline, ElementType::Polygon) => {
        self.fill_polyline_to_polygon(method, from, to)?;
      }
      (ElementType::Polygon, ElementType::Point) => {
        self.fill_polygon_to_point(method, from, to)?;
      }
      (ElementType::Polygon, ElementType::Polyline) => {
        self.fill_polygon_to_polyline(method, from, to)?;
      }
      (ElementType::Polygon, ElementType::Polygon) => {
        self.fill_polygon_to_polygon(method, from, to)?;
      }
      (ElementType::Polyline, ElementType::Polyline) => {
        return Err(SimlinkError::NotImplemented(
          "polyline to polyline mapping".into(),
        ));
      }
      (from_type, to_type) => {
        return Err(SimlinkError::mapping_plain(format!(
          "no mapping from {from_type:?} to {to_type:?}"
        )));
      }
    }

    debug!(
      rows = self.rows,
      cols = self.cols,
      non_zeros = self.matrix.non_zero_count(),
      ?method,
      "mapping matrix built"
    );

    self.initialized = true;
    Ok(())
  }

  /// Multiply the mapping matrix through a value set, time step by time
  /// step. The output carries the input's time structure; its value
  /// definition is left for the caller to supply.
  pub fn map_values(&self, input: &ValueSet2D) -> Result<ValueSet2D> {
    if !self.initialized {
      return Err(SimlinkError::mapping_plain(
        "mapper must be initialized before map_values",
      ));
    }
    if input.element_count() != self.cols {
      return Err(SimlinkError::mapping_plain(format!(
        "input has {} elements but the mapping matrix has {} columns",
        input.element_count(),
        self.cols
      )));
    }

    let mut out = ValueSet2D::new(crate::values::ScalarKind::Real, None);
    for t in 0..input.time_count() {
      let row = input.row_as_reals(t)?;
      out.push_real_row(&self.matrix.product(&row)?)?;
    }
    Ok(out)
  }

  /// Read one matrix entry with bounds checking.
  pub fn value_in_matrix(&self, row: usize, col: usize) -> Result<f64> {
    self.matrix.at(row, col)
  }

  /// Overwrite one matrix entry with bounds checking.
  pub fn set_value_in_matrix(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
    self.matrix.set(row, col, value)
  }

  // Filling rules ---------------------------------------------------------

  /// Distance-based fill shared by point/point, point/polyline and
  /// polyline/point mappings. `distance` yields the distance between source
  /// `j` and target `i`; Nearest and Inverse then turn each row of raw
  /// distances into weights.
  fn fill_distance_rows<S, T>(
    &mut self,
    method: MapMethod,
    sources: &[S],
    targets: &[T],
    distance: impl Fn(&S, &T) -> f64 + Sync,
  ) -> Result<()>
  where
    S: Sync,
    T: Sync,
  {
    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|target| {
        let distances: Vec<f64> = sources.iter().map(|s| distance(s, target)).collect();
        weigh_distance_row(method, &distances)
      })
      .collect::<Result<_>>()?;

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  fn fill_point_to_polygon(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    if !matches!(method, MapMethod::Mean | MapMethod::Sum) {
      return Err(unknown_method(method, "point to polygon"));
    }

    let sources = collect_points(from)?;
    let targets = collect_vertex_lists(to)?;

    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|polygon| {
        let inside: Vec<usize> = sources
          .iter()
          .enumerate()
          .filter(|(_, p)| geometry::point_in_polygon(**p, polygon))
          .map(|(j, _)| j)
          .collect();

        if inside.is_empty() {
          return Vec::new();
        }

        let weight = match method {
          MapMethod::Mean => 1.0 / inside.len() as f64,
          _ => 1.0,
        };
        inside.into_iter().map(|j| (j, weight)).collect()
      })
      .collect();

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  fn fill_polyline_to_polygon(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    if !matches!(method, MapMethod::WeightedMean | MapMethod::WeightedSum) {
      return Err(unknown_method(method, "polyline to polygon"));
    }

    let sources = collect_vertex_lists(from)?;
    let targets = collect_vertex_lists(to)?;

    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|polygon| {
        let lengths: Vec<f64> = sources
          .iter()
          .map(|polyline| geometry::length_of_polyline_inside_polygon(polyline, polygon))
          .collect();

        match method {
          MapMethod::WeightedMean => {
            let total: f64 = lengths.iter().sum();
            if total > 0.0 {
              non_zero_entries(lengths.iter().map(|l| l / total))
            } else {
              non_zero_entries(lengths.into_iter())
            }
          }
          _ => non_zero_entries(
            lengths
              .iter()
              .zip(&sources)
              .map(|(l, polyline)| l / geometry::polyline_length(polyline)),
          ),
        }
      })
      .collect();

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  fn fill_polygon_to_point(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    if method != MapMethod::Value {
      return Err(unknown_method(method, "polygon to point"));
    }

    let sources = collect_vertex_lists(from)?;
    let targets = collect_points(to)?;
    let tree = self.candidate_tree(from)?;

    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|point| {
        let candidates = candidate_columns(&tree, self.cols, || {
          GeomExtent::around_point(*point, 0.0)
        });

        // Strict containment first, polygon edges as the fallback.
        let mut hits: Vec<usize> = candidates
          .iter()
          .copied()
          .filter(|&j| geometry::point_in_polygon(*point, &sources[j]))
          .collect();

        if hits.is_empty() {
          hits = candidates
            .iter()
            .copied()
            .filter(|&j| {
              let polygon = &sources[j];
              (0..polygon.len()).any(|e| {
                let edge = [polygon[e], polygon[(e + 1) % polygon.len()]];
                geometry::point_on_segment(*point, &edge)
              })
            })
            .collect();
        }

        if hits.is_empty() {
          return Vec::new();
        }

        let weight = 1.0 / hits.len() as f64;
        hits.into_iter().map(|j| (j, weight)).collect()
      })
      .collect();

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  fn fill_polygon_to_polyline(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    if !matches!(method, MapMethod::WeightedMean | MapMethod::WeightedSum) {
      return Err(unknown_method(method, "polygon to polyline"));
    }

    let sources = collect_vertex_lists(from)?;
    let targets = collect_vertex_lists(to)?;

    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|polyline| {
        let target_length = geometry::polyline_length(polyline);
        let fractions: Vec<f64> = sources
          .iter()
          .map(|polygon| {
            geometry::length_of_polyline_inside_polygon(polyline, polygon) / target_length
          })
          .collect();

        match method {
          MapMethod::WeightedMean => {
            let total: f64 = fractions.iter().sum();
            if total > 0.0 {
              non_zero_entries(fractions.iter().map(|f| f / total))
            } else {
              non_zero_entries(fractions.into_iter())
            }
          }
          _ => non_zero_entries(fractions.into_iter()),
        }
      })
      .collect();

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  fn fill_polygon_to_polygon(
    &mut self,
    method: MapMethod,
    from: &ElementSet,
    to: &ElementSet,
  ) -> Result<()> {
    if !matches!(
      method,
      MapMethod::WeightedMean | MapMethod::WeightedSum | MapMethod::Distribute
    ) {
      return Err(unknown_method(method, "polygon to polygon"));
    }

    let sources = collect_vertex_lists(from)?;
    let targets = collect_vertex_lists(to)?;
    let tree = self.candidate_tree(from)?;

    let source_areas: Vec<f64> = sources.iter().map(|p| geometry::polygon_area(p)).collect();

    let rows: Vec<Vec<(usize, f64)>> = targets
      .par_iter()
      .map(|to_polygon| {
        let candidates =
          candidate_columns(&tree, self.cols, || GeomExtent::from_points(to_polygon));

        let mut entries = Vec::new();
        for j in candidates {
          let mut weight = geometry::polygon_shared_area(to_polygon, &sources[j])?;
          if method == MapMethod::Distribute {
            weight /= source_areas[j];
          }
          if weight != 0.0 {
            entries.push((j, weight));
          }
        }

        match method {
          MapMethod::WeightedMean => {
            let total: f64 = entries.iter().map(|(_, w)| w).sum();
            if total != 0.0 {
              for entry in &mut entries {
                entry.1 /= total;
              }
            }
          }
          MapMethod::WeightedSum => {
            let target_area = geometry::polygon_area(to_polygon);
            for entry in &mut entries {
              entry.1 /= target_area;
            }
          }
          _ => {}
        }

        Ok(entries)
      })
      .collect::<Result<_>>()?;

    for (i, entries) in rows.into_iter().enumerate() {
      self.matrix.set_row(i, &entries)?;
    }
    Ok(())
  }

  /// A search tree over the source set when both sides are large enough for
  /// pruning to pay off.
  fn candidate_tree(&self, from: &ElementSet) -> Result<Option<ElementSearchTree<usize>>> {
    if self.cols > SEARCH_TREE_THRESHOLD && self.rows > SEARCH_TREE_THRESHOLD {
      Ok(Some(build_search_tree(from)?))
    } else {
      Ok(None)
    }
  }
}

/// Candidate source columns for one target: a search-tree query when a tree
/// was built, otherwise every column.
fn candidate_columns(
  tree: &Option<ElementSearchTree<usize>>,
  cols: usize,
  extent: impl Fn() -> GeomExtent,
) -> Vec<usize> {
  match tree {
    Some(tree) => tree.find_elements(&extent()),
    None => (0..cols).collect(),
  }
}

/// Turn one row of raw distances into Nearest or Inverse weights.
fn weigh_distance_row(method: MapMethod, distances: &[f64]) -> Result<Vec<(usize, f64)>> {
  let min_dist = distances.iter().copied().fold(f64::INFINITY, f64::min);

  let nearest_row = || -> Vec<(usize, f64)> {
    let ties = distances.iter().filter(|&&d| d == min_dist).count();
    distances
      .iter()
      .enumerate()
      .filter(|(_, &d)| d == min_dist)
      .map(|(j, _)| (j, 1.0 / ties as f64))
      .collect()
  };

  match method {
    MapMethod::Nearest => Ok(nearest_row()),
    MapMethod::Inverse => {
      // An exact zero distance supersedes inverse weighting.
      if min_dist == 0.0 {
        return Ok(nearest_row());
      }
      let total: f64 = distances.iter().map(|d| 1.0 / d).sum();
      Ok(
        distances
          .iter()
          .enumerate()
          .map(|(j, d)| (j, (1.0 / d) / total))
          .collect(),
      )
    }
    other => Err(unknown_method(other, "distance-based mapping")),
  }
}

fn non_zero_entries(values: impl Iterator<Item = f64>) -> Vec<(usize, f64)> {
  values
    .enumerate()
    .filter(|(_, v)| *v != 0.0)
    .collect()
}

fn unknown_method(method: MapMethod, pairing: &str) -> SimlinkError {
  SimlinkError::mapping_plain(format!("method {method:?} is not valid for {pairing}"))
}

fn collect_points(set: &ElementSet) -> Result<Vec<DVec2>> {
  (0..set.element_count()).map(|i| set.xy_point(i)).collect()
}

fn collect_vertex_lists(set: &ElementSet) -> Result<Vec<Vec<DVec2>>> {
  (0..set.element_count()).map(|i| set.xy_vertices(i)).collect()
}
