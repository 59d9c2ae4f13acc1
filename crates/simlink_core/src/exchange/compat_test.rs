use glam::DVec2;

use crate::element::ElementSet;
use crate::quantity::{Quantity, Unit};
use crate::time::{Time, TimeSet};

use super::*;

fn depth() -> Quantity {
  Quantity::new(Unit::meter(), "depth", "water depth")
}

#[test]
fn test_quantity_check() {
  assert!(check_quantities(&depth(), &depth()).is_ok());

  let other = Quantity::new(Unit::meter(), "stage", "water stage");
  assert!(check_quantities(&depth(), &other).is_err());
}

#[test]
fn test_time_set_duration_agreement() {
  let mut stamps = TimeSet::new();
  stamps.add_time(Time::stamp(0.0)).unwrap();
  stamps.add_time(Time::stamp(1.0)).unwrap();

  let mut spans = TimeSet::new();
  spans.add_time(Time::span(0.0, 1.0)).unwrap();

  assert!(check_time_sets(&stamps, &stamps).is_ok());
  assert!(check_time_sets(&stamps, &spans).is_err());

  // An empty side passes; nothing has been exchanged yet.
  assert!(check_time_sets(&TimeSet::new(), &stamps).is_ok());
}

#[test]
fn test_time_set_overlap() {
  let mut producer = TimeSet::new();
  producer.add_time(Time::stamp(0.0)).unwrap();
  producer.add_time(Time::stamp(10.0)).unwrap();

  let mut inside = TimeSet::new();
  inside.add_time(Time::stamp(5.0)).unwrap();
  assert!(check_time_sets(&producer, &inside).is_ok());

  let mut beyond = TimeSet::new();
  beyond.add_time(Time::stamp(20.0)).unwrap();
  assert!(check_time_sets(&producer, &beyond).is_err());
}

#[test]
fn test_element_set_checks() {
  let a = ElementSet::points("a", &[DVec2::ZERO, DVec2::ONE]);
  let same = ElementSet::points("b", &[DVec2::ZERO, DVec2::ONE]);
  assert!(check_element_sets(&a, &same).is_ok());

  let shifted = ElementSet::points("c", &[DVec2::ZERO, DVec2::new(1.0, 2.0)]);
  assert!(check_element_sets(&a, &shifted).is_err());

  let fewer = ElementSet::points("d", &[DVec2::ZERO]);
  assert!(check_element_sets(&a, &fewer).is_err());

  let ids = ElementSet::id_based("e", &["x", "y"]);
  assert!(check_element_sets(&a, &ids).is_err());
}

#[test]
fn test_id_based_sets_compare_by_id() {
  let a = ElementSet::id_based("a", &["n1", "n2"]);
  let b = ElementSet::id_based("b", &["n1", "n2"]);
  let c = ElementSet::id_based("c", &["n1", "other"]);

  assert!(check_element_sets(&a, &b).is_ok());
  assert!(check_element_sets(&a, &c).is_err());
}
