//! Adapted outputs: transforming wrappers over outputs.
//!
//! An adapted output wraps exactly one adaptee (an output or another adapted
//! output) and rewrites its values in space or time. The area and length
//! adaptors scale values by a polygon-area or polyline-length power, the
//! spatial mapping adaptor re-expresses values on another element set, and
//! the time adaptor buffers values to answer for arbitrary request times.
//!
//! Construction happens here; the pull logic that needs graph access lives
//! with the pull engine.

use crate::buffer::TimeBuffer;
use crate::element::{ElementSet, ElementType};
use crate::error::{Result, SimlinkError};
use crate::geometry;
use crate::mapper::{ElementMapper, MapMethod};
use crate::quantity::{DimensionBase, Quantity};
use crate::time::TimeSet;

use super::{ComponentId, InputId, AdaptorId, ProviderRef};

/// The transformation an adapted output applies.
#[derive(Clone, Debug)]
pub enum AdaptorKind {
  /// Scale each element value by `area(polygon_i)^exponent`.
  Area { exponent: f64, factors: Vec<f64> },
  /// Scale each element value by `length(polyline_i)^exponent`.
  Length { exponent: f64, factors: Vec<f64> },
  /// Re-express values on a target element set through a mapping matrix.
  SpaceMap { mapper: ElementMapper },
  /// Buffer values over time and interpolate to the requested times.
  Time { buffer: TimeBuffer },
}

/// An adapted output in the link graph.
#[derive(Clone, Debug)]
pub struct AdaptedOutput {
  pub id: String,
  pub kind: AdaptorKind,
  /// The single adaptee this adaptor wraps.
  pub adaptee: ProviderRef,
  /// Component of the source output at the bottom of the chain.
  pub component: ComponentId,
  /// The value definition exposed to consumers, possibly rewritten.
  pub quantity: Quantity,
  /// The element set exposed to consumers.
  pub element_set: ElementSet,
  pub consumers: Vec<InputId>,
  /// Adapted outputs chained onto this one.
  pub adaptors: Vec<AdaptorId>,
  pub alive: bool,
}

impl AdaptedOutput {
  /// An area-scaling adaptor over a polygon adaptee.
  ///
  /// The factor per element is `area(polygon_i)^exponent`; the exposed
  /// quantity gains `2 * exponent` on its Length dimension and annotated
  /// captions.
  pub fn area(
    id: impl Into<String>,
    exponent: f64,
    adaptee: ProviderRef,
    component: ComponentId,
    adaptee_quantity: &Quantity,
    adaptee_elements: &ElementSet,
  ) -> Result<Self> {
    if adaptee_elements.element_type() != ElementType::Polygon {
      return Err(SimlinkError::IncompatibleItem(
        "area adaptor requires a polygon adaptee".into(),
      ));
    }

    let factors = (0..adaptee_elements.element_count())
      .map(|i| {
        let area = geometry::polygon_area(&adaptee_elements.xy_vertices(i)?);
        Ok(power_factor(area, exponent))
      })
      .collect::<Result<Vec<f64>>>()?;

    let quantity = annotate_quantity(
      adaptee_quantity,
      2.0 * exponent,
      &format!(" * m^{}", 2.0 * exponent),
      &format!(" * area^{exponent}"),
    );

    Ok(Self {
      id: id.into(),
      kind: AdaptorKind::Area { exponent, factors },
      adaptee,
      component,
      quantity,
      element_set: adaptee_elements.clone(),
      consumers: Vec::new(),
      adaptors: Vec::new(),
      alive: true,
    })
  }

  /// A length-scaling adaptor over a polyline adaptee.
  pub fn length(
    id: impl Into<String>,
    exponent: f64,
    adaptee: ProviderRef,
    component: ComponentId,
    adaptee_quantity: &Quantity,
    adaptee_elements: &ElementSet,
  ) -> Result<Self> {
    if adaptee_elements.element_type() != ElementType::Polyline {
      return Err(SimlinkError::IncompatibleItem(
        "length adaptor requires a polyline adaptee".into(),
      ));
    }

    let factors = (0..adaptee_elements.element_count())
      .map(|i| {
        let length = geometry::polyline_length(&adaptee_elements.xy_vertices(i)?);
        Ok(power_factor(length, exponent))
      })
      .collect::<Result<Vec<f64>>>()?;

    let quantity = annotate_quantity(
      adaptee_quantity,
      exponent,
      &format!(" * m^{exponent}"),
      &format!(" * length^{exponent}"),
    );

    Ok(Self {
      id: id.into(),
      kind: AdaptorKind::Length { exponent, factors },
      adaptee,
      component,
      quantity,
      element_set: adaptee_elements.clone(),
      consumers: Vec::new(),
      adaptors: Vec::new(),
      alive: true,
    })
  }

  /// A spatial mapping adaptor translating values from the adaptee's element
  /// set onto `target` under the given method.
  pub fn space_map(
    id: impl Into<String>,
    method: MapMethod,
    adaptee: ProviderRef,
    component: ComponentId,
    adaptee_quantity: &Quantity,
    adaptee_elements: &ElementSet,
    target: ElementSet,
  ) -> Result<Self> {
    let mut mapper = ElementMapper::new();
    mapper.initialize(method, adaptee_elements, &target)?;

    Ok(Self {
      id: id.into(),
      kind: AdaptorKind::SpaceMap { mapper },
      adaptee,
      component,
      quantity: adaptee_quantity.clone(),
      element_set: target,
      consumers: Vec::new(),
      adaptors: Vec::new(),
      alive: true,
    })
  }

  /// A buffering time adaptor.
  pub fn time(
    id: impl Into<String>,
    adaptee: ProviderRef,
    component: ComponentId,
    adaptee_quantity: &Quantity,
    adaptee_elements: &ElementSet,
  ) -> Self {
    Self {
      id: id.into(),
      kind: AdaptorKind::Time {
        buffer: TimeBuffer::new(),
      },
      adaptee,
      component,
      quantity: adaptee_quantity.clone(),
      element_set: adaptee_elements.clone(),
      consumers: Vec::new(),
      adaptors: Vec::new(),
      alive: true,
    }
  }

  /// The time structure this adaptor answers with; only the time adaptor
  /// has one of its own.
  pub fn own_times(&self) -> Option<&TimeSet> {
    match &self.kind {
      AdaptorKind::Time { buffer } => Some(buffer.times()),
      _ => None,
    }
  }
}

fn power_factor(base: f64, exponent: f64) -> f64 {
  if exponent == 1.0 {
    base
  } else if exponent == -1.0 {
    1.0 / base
  } else {
    base.powf(exponent)
  }
}

/// Rewrite a quantity for a space-scaling adaptor: bump the Length dimension
/// and annotate unit and quantity captions.
fn annotate_quantity(
  source: &Quantity,
  length_power_delta: f64,
  unit_suffix: &str,
  quantity_suffix: &str,
) -> Quantity {
  let mut quantity = source.clone();
  quantity
    .unit
    .dimension
    .raise_power(DimensionBase::Length, length_power_delta);
  quantity.unit.caption.push_str(unit_suffix);
  quantity.unit.description.push_str(unit_suffix);
  quantity.caption.push_str(quantity_suffix);
  quantity.description.push_str(quantity_suffix);
  quantity
}

#[cfg(test)]
#[path = "adaptors_test.rs"]
mod adaptors_test;
