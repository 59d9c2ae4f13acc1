//! Element-set validation run on entry to the mapper.

use crate::element::{ElementSet, ElementType};
use crate::error::{Result, SimlinkError};
use crate::geometry::{self, EPSILON};

/// Validate the geometric invariants of an element set.
///
/// Point elements carry exactly one vertex; polyline elements at least two
/// vertices and only positive-length segments; polygon elements must be
/// simple with positive area. Id-based and polyhedron sets cannot feed the
/// 2-D mapper at all.
pub fn check_element_set(set: &ElementSet) -> Result<()> {
  match set.element_type() {
    ElementType::Point => {
      for i in 0..set.element_count() {
        if set.vertex_count(i)? != 1 {
          return Err(invalid(set, i, "point element must have exactly one vertex"));
        }
      }
    }
    ElementType::Polyline => {
      for i in 0..set.element_count() {
        let vertices = set.xy_vertices(i)?;
        if vertices.len() < 2 {
          return Err(invalid(set, i, "polyline element must have at least two vertices"));
        }
        for pair in vertices.windows(2) {
          if geometry::distance(pair[0], pair[1]) <= EPSILON {
            return Err(invalid(set, i, "polyline element has a zero-length segment"));
          }
        }
      }
    }
    ElementType::Polygon => {
      for i in 0..set.element_count() {
        if !geometry::is_valid_polygon(&set.xy_vertices(i)?) {
          return Err(invalid(set, i, "polygon element is degenerate or self-intersecting"));
        }
      }
    }
    other => {
      return Err(SimlinkError::ContractViolation(format!(
        "element set [{}] of type {:?} cannot be mapped spatially",
        set.id, other
      )));
    }
  }

  Ok(())
}

fn invalid(set: &ElementSet, index: usize, what: &str) -> SimlinkError {
  let id = set.element_id(index).unwrap_or("?");
  SimlinkError::ContractViolation(format!("{what}; element [{id}] in set [{}]", set.id))
}

#[cfg(test)]
#[path = "checker_test.rs"]
mod checker_test;
