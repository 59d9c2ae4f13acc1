use glam::DVec2;

use crate::element::{Element, ElementSet, ElementType};

use super::*;

#[test]
fn test_valid_sets_pass() {
  let points = ElementSet::points("p", &[DVec2::ZERO, DVec2::ONE]);
  assert!(check_element_set(&points).is_ok());

  let lines = ElementSet::polylines("l", &[vec![DVec2::ZERO, DVec2::new(1.0, 0.0)]]);
  assert!(check_element_set(&lines).is_ok());

  let square = ElementSet::polygon(
    "g",
    &[
      DVec2::new(0.0, 0.0),
      DVec2::new(1.0, 0.0),
      DVec2::new(1.0, 1.0),
      DVec2::new(0.0, 1.0),
    ],
  );
  assert!(check_element_set(&square).is_ok());
}

#[test]
fn test_point_with_extra_vertices_fails() {
  let bad = ElementSet::new(
    "p",
    ElementType::Point,
    vec![Element::new("0", vec![glam::DVec3::ZERO, glam::DVec3::ONE])],
  );
  assert!(check_element_set(&bad).is_err());
}

#[test]
fn test_degenerate_polyline_fails() {
  let bad = ElementSet::polylines("l", &[vec![DVec2::ZERO, DVec2::ZERO]]);
  assert!(check_element_set(&bad).is_err());

  let too_short = ElementSet::polylines("l2", &[vec![DVec2::ZERO]]);
  assert!(check_element_set(&too_short).is_err());
}

#[test]
fn test_self_intersecting_polygon_fails() {
  let bow_tie = ElementSet::polygon(
    "g",
    &[
      DVec2::new(0.0, 0.0),
      DVec2::new(1.0, 1.0),
      DVec2::new(1.0, 0.0),
      DVec2::new(0.0, 1.0),
    ],
  );
  assert!(check_element_set(&bow_tie).is_err());
}

#[test]
fn test_id_based_set_cannot_be_mapped() {
  let ids = ElementSet::id_based("ids", &["a"]);
  assert!(check_element_set(&ids).is_err());
}
