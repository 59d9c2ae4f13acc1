use approx::assert_relative_eq;
use glam::DVec2;

use crate::element::ElementSet;
use crate::quantity::{DimensionBase, Quantity, Unit};

use super::*;

fn flow() -> Quantity {
  Quantity::new(Unit::cubic_meter_per_second(), "flow", "discharge")
}

fn unit_square() -> ElementSet {
  ElementSet::polygon(
    "sq",
    &[
      DVec2::new(0.0, 0.0),
      DVec2::new(1.0, 0.0),
      DVec2::new(1.0, 1.0),
      DVec2::new(0.0, 1.0),
    ],
  )
}

#[test]
fn test_area_adaptor_factors_and_quantity() {
  let elements = ElementSet::polygons(
    "polys",
    &[
      vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(2.0, 0.0),
        DVec2::new(2.0, 2.0),
        DVec2::new(0.0, 2.0),
      ],
    ],
  );

  let adaptor = AdaptedOutput::area(
    "a",
    1.0,
    ProviderRef::Output(super::super::OutputId(0)),
    ComponentId(0),
    &flow(),
    &elements,
  )
  .unwrap();

  match &adaptor.kind {
    AdaptorKind::Area { factors, .. } => assert_relative_eq!(factors[0], 4.0),
    other => panic!("unexpected kind {other:?}"),
  }

  // Length power goes up by 2 * exponent and the captions are annotated.
  let source_power = flow().unit.dimension.power(DimensionBase::Length);
  assert_relative_eq!(
    adaptor.quantity.unit.dimension.power(DimensionBase::Length),
    source_power + 2.0
  );
  assert!(adaptor.quantity.caption.contains("area^1"));
}

#[test]
fn test_area_adaptor_rejects_non_polygons() {
  let points = ElementSet::points("p", &[DVec2::ZERO]);
  assert!(AdaptedOutput::area(
    "a",
    1.0,
    ProviderRef::Output(super::super::OutputId(0)),
    ComponentId(0),
    &flow(),
    &points,
  )
  .is_err());
}

#[test]
fn test_length_adaptor_factors() {
  let lines = ElementSet::polylines("l", &[vec![DVec2::ZERO, DVec2::new(3.0, 4.0)]]);

  let adaptor = AdaptedOutput::length(
    "l",
    2.0,
    ProviderRef::Output(super::super::OutputId(0)),
    ComponentId(0),
    &flow(),
    &lines,
  )
  .unwrap();

  match &adaptor.kind {
    AdaptorKind::Length { factors, .. } => assert_relative_eq!(factors[0], 25.0),
    other => panic!("unexpected kind {other:?}"),
  }
}

#[test]
fn test_space_map_adaptor_exposes_target_set() {
  let source = ElementSet::points("src", &[DVec2::new(0.25, 0.25)]);
  let target = unit_square();

  let adaptor = AdaptedOutput::space_map(
    "m",
    crate::mapper::MapMethod::Sum,
    ProviderRef::Output(super::super::OutputId(0)),
    ComponentId(0),
    &flow(),
    &source,
    target,
  )
  .unwrap();

  assert_eq!(adaptor.element_set.element_count(), 1);
  assert!(matches!(adaptor.kind, AdaptorKind::SpaceMap { .. }));
}

#[test]
fn test_time_adaptor_starts_empty() {
  let adaptor = AdaptedOutput::time(
    "t",
    ProviderRef::Output(super::super::OutputId(0)),
    ComponentId(0),
    &flow(),
    &unit_square(),
  );

  assert_eq!(adaptor.own_times().unwrap().len(), 0);
}
