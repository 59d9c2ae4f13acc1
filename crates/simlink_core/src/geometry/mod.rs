//! Planar geometry kernel.
//!
//! Pure functions over `DVec2` points used by the element mapper and the
//! search tree: distances, segment intersection, point-in-polygon, polygon
//! area/perimeter, polygon overlap via triangulation, and polyline clipping
//! against polygons.
//!
//! All tolerant comparisons use [`EPSILON`].

pub mod extent;
pub mod overlap;
pub mod triangulate;

pub use extent::GeomExtent;
pub use overlap::{
  length_of_polyline_inside_polygon, polygon_shared_area, shared_segment_length,
  triangle_shared_area,
};
pub use triangulate::split_polygon_to_triangles;

use glam::DVec2;

/// Tolerance for all geometric comparisons.
pub const EPSILON: f64 = 1e-6;

/// A line segment between two points.
pub type Segment = [DVec2; 2];

/// 2-D cross product of `a` and `b`.
#[inline]
pub(crate) fn cross(a: DVec2, b: DVec2) -> f64 {
  a.x * b.y - a.y * b.x
}

/// Euclidean distance between two points.
pub fn distance(p1: DVec2, p2: DVec2) -> f64 {
  p1.distance(p2)
}

/// Distance from `point` to the segment `line`.
///
/// If the projection of the point lies beyond an endpoint, the distance to
/// that endpoint is returned; otherwise the perpendicular distance.
pub fn point_to_line_distance(line: &Segment, point: DVec2) -> f64 {
  let [p1, p2] = *line;

  // Degenerate segment.
  if p1.distance(p2) <= EPSILON {
    return distance(point, p1);
  }

  let dir = p2 - p1;

  // Projection falls before p1.
  if dir.dot(point - p1) <= EPSILON {
    return distance(point, p1);
  }

  // Projection falls after p2.
  if dir.dot(point - p2) >= EPSILON {
    return distance(point, p2);
  }

  cross(dir, point - p1).abs() / dir.length()
}

/// Minimum distance from `point` to any segment of `polyline`.
pub fn point_to_polyline_distance(polyline: &[DVec2], point: DVec2) -> f64 {
  if polyline.is_empty() {
    return 0.0;
  }
  if polyline.len() == 1 {
    return distance(point, polyline[0]);
  }

  polyline
    .windows(2)
    .map(|pair| point_to_line_distance(&[pair[0], pair[1]], point))
    .fold(f64::INFINITY, f64::min)
}

/// True if the two segments properly cross.
///
/// Parallel collinear segments do not count as intersecting, nor do segments
/// that merely touch at an endpoint within [`EPSILON`].
pub fn segments_intersect(l1: &Segment, l2: &Segment) -> bool {
  let [a1, a2] = *l1;
  let [b1, b2] = *l2;

  // Fast AABB rejection.
  if a1.x.max(a2.x) <= b1.x.min(b2.x)
    || b1.y.max(b2.y) <= a1.y.min(a2.y)
    || b1.x.max(b2.x) <= a1.x.min(a2.x)
    || a1.y.max(a2.y) <= b1.y.min(b2.y)
  {
    return false;
  }

  // Two-sided straddle test.
  let d1 = cross(a1 - b2, b1 - b2);
  let d2 = cross(a2 - b2, b1 - b2);
  let d3 = cross(b1 - a2, a1 - a2);
  let d4 = cross(b2 - a2, a1 - a2);

  if d1 * d2 >= EPSILON || d3 * d4 >= EPSILON {
    return false;
  }
  if (d1 * d2).abs() <= EPSILON && (d3 * d4).abs() <= EPSILON {
    // Collinear.
    return false;
  }

  true
}

/// Intersection point of two segments.
///
/// The caller must have proven intersection with [`segments_intersect`];
/// the parametric solution is undefined for parallel segments.
pub fn segment_intersection(l1: &Segment, l2: &Segment) -> DVec2 {
  let [a1, a2] = *l1;
  let [b1, b2] = *l2;

  let area1 = cross(a2 - a1, b1 - a1);
  let area2 = cross(a2 - a1, b2 - a1);

  let lambda = area1.abs() / area2.abs();
  b1 + lambda / (lambda + 1.0) * (b2 - b1)
}

/// Midpoint of a segment.
pub fn midpoint(line: &Segment) -> DVec2 {
  (line[0] + line[1]) * 0.5
}

/// Signed shoelace area; positive for counter-clockwise rings.
pub(crate) fn signed_area(polygon: &[DVec2]) -> f64 {
  if polygon.len() < 3 {
    return 0.0;
  }

  let mut area = 0.0;
  for i in 0..polygon.len() {
    let j = (i + 1) % polygon.len();
    area += cross(polygon[i], polygon[j]);
  }
  area * 0.5
}

/// Absolute area of a polygon via the shoelace formula.
pub fn polygon_area(polygon: &[DVec2]) -> f64 {
  signed_area(polygon).abs()
}

/// Total length of a polyline.
pub fn polyline_length(polyline: &[DVec2]) -> f64 {
  polyline
    .windows(2)
    .map(|pair| distance(pair[0], pair[1]))
    .sum()
}

/// Perimeter of a closed polygon.
pub fn polygon_perimeter(polygon: &[DVec2]) -> f64 {
  if polygon.is_empty() {
    return 0.0;
  }

  let mut length = 0.0;
  for i in 0..polygon.len() {
    let j = (i + 1) % polygon.len();
    length += distance(polygon[i], polygon[j]);
  }
  length
}

/// The `i`-th edge of a polygon, wrapping at the end.
pub(crate) fn polygon_edge(polygon: &[DVec2], i: usize) -> Segment {
  let j = (i + 1) % polygon.len();
  [polygon[i], polygon[j]]
}

/// Validity per the element-set contract: at least three vertices, positive
/// area, positive edge lengths and no self-intersecting edges.
pub fn is_valid_polygon(polygon: &[DVec2]) -> bool {
  if polygon.len() < 3 {
    return false;
  }
  if polygon_area(polygon) <= EPSILON {
    return false;
  }

  for i in 0..polygon.len() {
    let edge = polygon_edge(polygon, i);
    if distance(edge[0], edge[1]) <= EPSILON {
      return false;
    }
    for j in 0..i {
      if segments_intersect(&edge, &polygon_edge(polygon, j)) {
        return false;
      }
    }
  }

  true
}

/// Ray-cast point-in-polygon test.
///
/// Casts toward +x counting only crossings strictly right of the point and
/// strictly between each edge's y-extremes, half-open on the bottom so a
/// shared vertex is counted once.
pub fn point_in_polygon(point: DVec2, polygon: &[DVec2]) -> bool {
  let mut inside = false;

  for i in 0..polygon.len() {
    let [a, b] = polygon_edge(polygon, i);
    let (x1, y1) = (a.x, a.y);
    let (x2, y2) = (b.x, b.y);

    if point.y - y1.min(y2) >= EPSILON
      && y1.max(y2) - point.y >= EPSILON
      && x1.max(x2) - point.x >= EPSILON
      && (y1 - y2).abs() > EPSILON
    {
      let x_inter = (point.y - y1) * (x2 - x1) / (y2 - y1) + x1;
      if (x1 - x2).abs() <= EPSILON || x_inter - point.x >= EPSILON {
        inside = !inside;
      }
    }
  }

  inside
}

/// True if `point` lies on the segment within [`EPSILON`].
pub fn point_on_segment(point: DVec2, line: &Segment) -> bool {
  point_to_line_distance(line, point) <= EPSILON
}

/// Centroid (vertex mean) of a polygon.
pub fn polygon_centroid(polygon: &[DVec2]) -> DVec2 {
  if polygon.is_empty() {
    return DVec2::ZERO;
  }
  polygon.iter().copied().sum::<DVec2>() / polygon.len() as f64
}
