//! Value definitions: dimensions, units and quantities.
//!
//! Two exchange items are connectable only if their quantities compare equal,
//! so everything here implements structural equality.

/// The eight base axes a dimension is expressed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimensionBase {
  Length,
  Mass,
  Time,
  ElectricCurrent,
  Temperature,
  AmountOfSubstance,
  LuminousIntensity,
  Currency,
}

impl DimensionBase {
  pub const ALL: [DimensionBase; 8] = [
    DimensionBase::Length,
    DimensionBase::Mass,
    DimensionBase::Time,
    DimensionBase::ElectricCurrent,
    DimensionBase::Temperature,
    DimensionBase::AmountOfSubstance,
    DimensionBase::LuminousIntensity,
    DimensionBase::Currency,
  ];

  fn index(self) -> usize {
    match self {
      DimensionBase::Length => 0,
      DimensionBase::Mass => 1,
      DimensionBase::Time => 2,
      DimensionBase::ElectricCurrent => 3,
      DimensionBase::Temperature => 4,
      DimensionBase::AmountOfSubstance => 5,
      DimensionBase::LuminousIntensity => 6,
      DimensionBase::Currency => 7,
    }
  }
}

/// A mapping from the eight base axes to a real power.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Dimension {
  powers: [f64; 8],
}

impl Dimension {
  /// The dimensionless dimension (all powers zero).
  pub fn none() -> Self {
    Self::default()
  }

  /// Length^1.
  pub fn length() -> Self {
    let mut dim = Self::default();
    dim.set_power(DimensionBase::Length, 1.0);
    dim
  }

  /// Length^2.
  pub fn area() -> Self {
    let mut dim = Self::default();
    dim.set_power(DimensionBase::Length, 2.0);
    dim
  }

  /// Length^3 / Time.
  pub fn volume_per_time() -> Self {
    let mut dim = Self::default();
    dim.set_power(DimensionBase::Length, 3.0);
    dim.set_power(DimensionBase::Time, -1.0);
    dim
  }

  pub fn power(&self, base: DimensionBase) -> f64 {
    self.powers[base.index()]
  }

  pub fn set_power(&mut self, base: DimensionBase, power: f64) {
    self.powers[base.index()] = power;
  }

  /// Add `delta` to the power of one base axis.
  pub fn raise_power(&mut self, base: DimensionBase, delta: f64) {
    self.powers[base.index()] += delta;
  }
}

/// A unit: a dimension plus an affine conversion to SI (`si = factor * x + offset`).
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
  pub dimension: Dimension,
  pub caption: String,
  pub description: String,
  pub conversion_factor_to_si: f64,
  pub offset_to_si: f64,
}

impl Unit {
  pub fn new(dimension: Dimension, caption: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      dimension,
      caption: caption.into(),
      description: description.into(),
      conversion_factor_to_si: 1.0,
      offset_to_si: 0.0,
    }
  }

  pub fn with_conversion(mut self, factor: f64, offset: f64) -> Self {
    self.conversion_factor_to_si = factor;
    self.offset_to_si = offset;
    self
  }

  /// Dimensionless unit of one.
  pub fn unity() -> Self {
    Self::new(Dimension::none(), "-", "dimensionless")
  }

  pub fn meter() -> Self {
    Self::new(Dimension::length(), "m", "meter")
  }

  pub fn cubic_meter_per_second() -> Self {
    Self::new(Dimension::volume_per_time(), "m3/s", "cubic meter per second")
  }

  /// Apply the affine conversion to a raw value.
  pub fn to_si(&self, value: f64) -> f64 {
    self.conversion_factor_to_si * value + self.offset_to_si
  }
}

/// A quantity ties a unit to a caption, description and missing-data sentinel.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantity {
  pub unit: Unit,
  pub caption: String,
  pub description: String,
  pub missing_data_value: f64,
}

impl Quantity {
  pub fn new(unit: Unit, caption: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      unit,
      caption: caption.into(),
      description: description.into(),
      missing_data_value: -9999.0,
    }
  }

  pub fn with_missing_data_value(mut self, sentinel: f64) -> Self {
    self.missing_data_value = sentinel;
    self
  }
}

#[cfg(test)]
#[path = "quantity_test.rs"]
mod quantity_test;
