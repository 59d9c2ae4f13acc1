//! Ear-clipping polygon triangulation.

use glam::DVec2;

use crate::error::{Result, SimlinkError};

use super::{cross, is_valid_polygon, point_in_polygon, signed_area, EPSILON};

/// A triangle as three counter-clockwise vertices.
pub type Triangle = [DVec2; 3];

/// Split a simple polygon into triangles by ear clipping.
///
/// Each clipped ear has a strictly convex apex and contains no other polygon
/// vertex. The input may wind either way; triangles come out counter-clockwise.
pub fn split_polygon_to_triangles(polygon: &[DVec2]) -> Result<Vec<Triangle>> {
  if !is_valid_polygon(polygon) {
    return Err(SimlinkError::ContractViolation(
      "cannot triangulate an invalid polygon".into(),
    ));
  }

  let mut ring: Vec<DVec2> = polygon.to_vec();
  if signed_area(&ring) < 0.0 {
    ring.reverse();
  }

  let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
  while ring.len() > 3 {
    let i = find_ear(&ring)?;
    let n = ring.len();
    let prev = (i + n - 1) % n;
    let next = (i + 1) % n;

    triangles.push([ring[prev], ring[i], ring[next]]);
    ring.remove(i);
  }

  triangles.push([ring[0], ring[1], ring[2]]);
  Ok(triangles)
}

/// Index of the first vertex that forms a clippable ear.
fn find_ear(ring: &[DVec2]) -> Result<usize> {
  for i in 0..ring.len() {
    if is_apex_convex(ring, i) && !ear_contains_vertex(ring, i) {
      return Ok(i);
    }
  }

  Err(SimlinkError::ContractViolation(
    "no clippable ear found while triangulating polygon".into(),
  ))
}

/// True when the apex at `i` turns left (the ring is counter-clockwise).
fn is_apex_convex(ring: &[DVec2], i: usize) -> bool {
  let n = ring.len();
  let prev = ring[(i + n - 1) % n];
  let next = ring[(i + 1) % n];
  let apex = ring[i];

  cross(apex - prev, next - apex) > EPSILON
}

/// True when any other ring vertex lies inside the candidate ear triangle.
fn ear_contains_vertex(ring: &[DVec2], i: usize) -> bool {
  let n = ring.len();
  let prev = (i + n - 1) % n;
  let next = (i + 1) % n;
  let ear = [ring[prev], ring[i], ring[next]];

  (0..n)
    .filter(|&j| j != prev && j != i && j != next)
    .any(|j| point_in_polygon(ring[j], &ear))
}

#[cfg(test)]
#[path = "triangulate_test.rs"]
mod triangulate_test;
