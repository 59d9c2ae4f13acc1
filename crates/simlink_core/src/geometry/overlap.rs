//! Polygon overlap areas and polyline clipping.

use glam::DVec2;

use crate::error::Result;

use super::triangulate::{split_polygon_to_triangles, Triangle};
use super::{
  cross, distance, midpoint, point_in_polygon, point_on_segment, polygon_area, polygon_edge,
  segment_intersection, segments_intersect, signed_area, Segment, EPSILON,
};

/// Area shared by two simple polygons.
///
/// Both polygons are ear-clipped into triangles and the pairwise triangle
/// intersection areas are summed.
pub fn polygon_shared_area(a: &[DVec2], b: &[DVec2]) -> Result<f64> {
  let triangles_a = split_polygon_to_triangles(a)?;
  let triangles_b = split_polygon_to_triangles(b)?;

  let mut area = 0.0;
  for ta in &triangles_a {
    for tb in &triangles_b {
      area += triangle_shared_area(ta, tb);
    }
  }

  Ok(area)
}

/// Area shared by two triangles.
///
/// The first triangle is clipped against each edge half-plane of the second
/// (Sutherland-Hodgman on a convex pair); full containment falls out of the
/// clip with no special casing.
pub fn triangle_shared_area(t1: &Triangle, t2: &Triangle) -> f64 {
  let mut subject: Vec<DVec2> = t1.to_vec();
  if signed_area(&subject) < 0.0 {
    subject.reverse();
  }

  let mut clip: Vec<DVec2> = t2.to_vec();
  if signed_area(&clip) < 0.0 {
    clip.reverse();
  }

  for i in 0..clip.len() {
    let [a, b] = polygon_edge(&clip, i);
    subject = clip_against_halfplane(&subject, a, b);
    if subject.len() < 3 {
      return 0.0;
    }
  }

  polygon_area(&subject)
}

/// Clip a polygon against the left half-plane of the directed edge `a -> b`.
fn clip_against_halfplane(polygon: &[DVec2], a: DVec2, b: DVec2) -> Vec<DVec2> {
  let edge = b - a;
  let inside = |p: DVec2| cross(edge, p - a) >= -EPSILON;

  let mut out = Vec::with_capacity(polygon.len() + 2);
  for i in 0..polygon.len() {
    let current = polygon[i];
    let next = polygon[(i + 1) % polygon.len()];

    let current_in = inside(current);
    let next_in = inside(next);

    if current_in {
      out.push(current);
    }
    if current_in != next_in {
      out.push(line_halfplane_crossing(current, next, a, edge));
    }
  }

  out
}

/// Where the segment `p -> q` crosses the boundary line through `a` with
/// direction `edge`.
fn line_halfplane_crossing(p: DVec2, q: DVec2, a: DVec2, edge: DVec2) -> DVec2 {
  let dp = cross(edge, p - a);
  let dq = cross(edge, q - a);
  let t = dp / (dp - dq);
  p + t * (q - p)
}

/// Collinear overlap length of two segments; zero unless they lie on the
/// same line.
pub fn shared_segment_length(line_a: &Segment, line_b: &Segment) -> f64 {
  let [a1, a2] = *line_a;
  let [b1, b2] = *line_b;

  let a_vertical = (a2.x - a1.x).abs() < EPSILON;
  let b_vertical = (b2.x - b1.x).abs() < EPSILON;

  if a_vertical && b_vertical {
    if (a1.x - b1.x).abs() >= EPSILON {
      return 0.0;
    }
    let lo = a1.y.min(a2.y).max(b1.y.min(b2.y));
    let hi = a1.y.max(a2.y).min(b1.y.max(b2.y));
    return (hi - lo).max(0.0);
  }

  if a_vertical || b_vertical {
    return 0.0;
  }

  // Compare slope and intercept.
  let slope_a = (a2.y - a1.y) / (a2.x - a1.x);
  let slope_b = (b2.y - b1.y) / (b2.x - b1.x);
  let intercept_a = a1.y - slope_a * a1.x;
  let intercept_b = b1.y - slope_b * b1.x;

  if (slope_a - slope_b).abs() >= EPSILON || (intercept_a - intercept_b).abs() >= EPSILON {
    return 0.0;
  }

  let x1 = a1.x.min(a2.x).max(b1.x.min(b2.x));
  let x2 = a1.x.max(a2.x).min(b1.x.max(b2.x));
  if x1 >= x2 {
    return 0.0;
  }

  distance(
    DVec2::new(x1, slope_a * x1 + intercept_a),
    DVec2::new(x2, slope_a * x2 + intercept_a),
  )
}

/// Length of the part of a segment lying inside a polygon.
///
/// The segment is split at every crossing with a polygon edge (and at
/// polygon vertices interior to the segment); pieces whose midpoint is
/// inside count in full, pieces lying on a polygon edge count half.
pub fn length_of_segment_inside_polygon(line: &Segment, polygon: &[DVec2]) -> f64 {
  let [p, q] = *line;
  let full = distance(p, q);
  if full <= EPSILON {
    return 0.0;
  }

  // Split parameters along the segment.
  let mut cuts = vec![0.0, 1.0];
  for i in 0..polygon.len() {
    let edge = polygon_edge(polygon, i);

    if segments_intersect(line, &edge) {
      let crossing = segment_intersection(line, &edge);
      cuts.push(distance(p, crossing) / full);
    }

    // Polygon corners lying on the segment also delimit pieces.
    for corner in edge {
      if point_on_segment(corner, line) {
        let t = distance(p, corner) / full;
        if t > EPSILON && t < 1.0 - EPSILON {
          cuts.push(t);
        }
      }
    }
  }

  cuts.sort_by(f64::total_cmp);
  cuts.dedup_by(|a, b| (*a - *b).abs() <= EPSILON / full.max(1.0));

  let mut length_inside = 0.0;
  for pair in cuts.windows(2) {
    let piece: Segment = [p + pair[0] * (q - p), p + pair[1] * (q - p)];
    let piece_length = distance(piece[0], piece[1]);
    if piece_length <= EPSILON {
      continue;
    }

    let shared: f64 = (0..polygon.len())
      .map(|i| shared_segment_length(&piece, &polygon_edge(polygon, i)))
      .sum();

    if shared > EPSILON {
      // On-edge length is claimed half by either side.
      length_inside += shared / 2.0;
    } else if point_in_polygon(midpoint(&piece), polygon) {
      length_inside += piece_length;
    }
  }

  length_inside
}

/// Length of the part of a polyline lying inside a polygon.
pub fn length_of_polyline_inside_polygon(polyline: &[DVec2], polygon: &[DVec2]) -> f64 {
  polyline
    .windows(2)
    .map(|pair| length_of_segment_inside_polygon(&[pair[0], pair[1]], polygon))
    .sum()
}

#[cfg(test)]
#[path = "overlap_test.rs"]
mod overlap_test;
