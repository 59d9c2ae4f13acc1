//! Connectability checks between providers and consumers.
//!
//! Adding a consumer to an output runs three checks in order: quantity
//! equality, time-set compatibility, element-set compatibility. Any failure
//! rejects the connection with `IncompatibleItem` and leaves both sides
//! untouched.

use crate::element::{ElementSet, ElementType};
use crate::error::{Result, SimlinkError};
use crate::geometry::EPSILON;
use crate::quantity::Quantity;
use crate::time::TimeSet;

/// Quantities must match structurally: unit, dimension powers, captions,
/// descriptions and the missing-data sentinel.
pub fn check_quantities(provider: &Quantity, consumer: &Quantity) -> Result<()> {
  if provider != consumer {
    return Err(SimlinkError::IncompatibleItem(format!(
      "quantity [{}] does not match quantity [{}]",
      provider.caption, consumer.caption
    )));
  }
  Ok(())
}

/// Both sides must agree on whether times carry durations, and a non-empty
/// consumer time set must overlap the producer's horizon.
pub fn check_time_sets(provider: &TimeSet, consumer: &TimeSet) -> Result<()> {
  if provider.is_empty() || consumer.is_empty() {
    // Nothing exchanged yet; nothing to disagree about.
    return Ok(());
  }

  if provider.has_durations() != consumer.has_durations() {
    return Err(SimlinkError::IncompatibleItem(
      "provider and consumer disagree on time durations".into(),
    ));
  }

  let p = provider.horizon().expect("non-empty time set");
  let c = consumer.horizon().expect("non-empty time set");
  if c.timestamp() > p.end() || c.end() < p.timestamp() {
    return Err(SimlinkError::IncompatibleItem(
      "consumer time set does not overlap the provider horizon".into(),
    ));
  }

  Ok(())
}

/// Element sets must have the same type and count, and be equal id-by-id
/// (id-based sets) or structurally within tolerance (geometric sets).
///
/// Unequal geometric sets are legal only behind a spatial adapted output,
/// which is not this code path.
pub fn check_element_sets(provider: &ElementSet, consumer: &ElementSet) -> Result<()> {
  if provider.element_type() != consumer.element_type() {
    return Err(SimlinkError::IncompatibleItem(format!(
      "element type {:?} does not match {:?}",
      provider.element_type(),
      consumer.element_type()
    )));
  }

  if provider.element_count() != consumer.element_count() {
    return Err(SimlinkError::IncompatibleItem(format!(
      "element count {} does not match {}",
      provider.element_count(),
      consumer.element_count()
    )));
  }

  if provider.element_type() == ElementType::IdBased {
    for i in 0..provider.element_count() {
      if provider.element_id(i)? != consumer.element_id(i)? {
        return Err(SimlinkError::IncompatibleItem(format!(
          "element id [{}] does not match [{}]",
          provider.element_id(i)?,
          consumer.element_id(i)?
        )));
      }
    }
    return Ok(());
  }

  for i in 0..provider.element_count() {
    if provider.vertex_count(i)? != consumer.vertex_count(i)? {
      return Err(SimlinkError::IncompatibleItem(format!(
        "element {i} vertex counts differ"
      )));
    }
    for v in 0..provider.vertex_count(i)? {
      let a = provider.vertex(i, v)?;
      let b = consumer.vertex(i, v)?;
      if (a - b).abs().max_element() > EPSILON {
        return Err(SimlinkError::IncompatibleItem(format!(
          "element {i} vertex {v} differs beyond tolerance; bridge the sets with a spatial adaptor"
        )));
      }
    }
  }

  Ok(())
}

#[cfg(test)]
#[path = "compat_test.rs"]
mod compat_test;
