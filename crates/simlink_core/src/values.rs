//! Two-dimensional value sets indexed `[time][element]`.
//!
//! Each cell holds one dynamically typed scalar constrained to the set's
//! declared primitive kind. Every write is validated; a kind mismatch is a
//! contract violation, never a silent coercion.

use crate::error::{Result, SimlinkError};
use crate::quantity::Quantity;

/// The primitive a value set is declared over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
  Int,
  Real,
}

/// A single dynamically typed cell value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
  Int(i64),
  Real(f64),
}

impl Scalar {
  pub fn kind(&self) -> ScalarKind {
    match self {
      Scalar::Int(_) => ScalarKind::Int,
      Scalar::Real(_) => ScalarKind::Real,
    }
  }

  /// The cell as `f64` regardless of kind.
  pub fn as_real(&self) -> f64 {
    match self {
      Scalar::Int(v) => *v as f64,
      Scalar::Real(v) => *v,
    }
  }
}

impl From<f64> for Scalar {
  fn from(v: f64) -> Self {
    Scalar::Real(v)
  }
}

impl From<i64> for Scalar {
  fn from(v: i64) -> Self {
    Scalar::Int(v)
  }
}

/// A `values[T][E]` grid with a declared scalar kind and an optional quantity.
///
/// Invariant: every row has the same element count; the outer length tracks
/// the owning time set. Row and element removal shift later indices down.
#[derive(Clone, Debug)]
pub struct ValueSet2D {
  kind: ScalarKind,
  quantity: Option<Quantity>,
  values: Vec<Vec<Scalar>>,
}

impl ValueSet2D {
  pub fn new(kind: ScalarKind, quantity: Option<Quantity>) -> Self {
    Self {
      kind,
      quantity,
      values: Vec::new(),
    }
  }

  /// A real-valued set built from raw rows.
  pub fn from_reals(rows: Vec<Vec<f64>>, quantity: Option<Quantity>) -> Self {
    let values = rows
      .into_iter()
      .map(|row| row.into_iter().map(Scalar::Real).collect())
      .collect();
    Self {
      kind: ScalarKind::Real,
      quantity,
      values,
    }
  }

  pub fn kind(&self) -> ScalarKind {
    self.kind
  }

  pub fn quantity(&self) -> Option<&Quantity> {
    self.quantity.as_ref()
  }

  pub fn set_quantity(&mut self, quantity: Option<Quantity>) {
    self.quantity = quantity;
  }

  /// Number of time rows.
  pub fn time_count(&self) -> usize {
    self.values.len()
  }

  /// Number of elements in row `t`, or of the first row when `t` is absent.
  pub fn element_count(&self) -> usize {
    self.values.first().map(Vec::len).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  fn check_kind(&self, value: Scalar) -> Result<()> {
    if value.kind() != self.kind {
      return Err(SimlinkError::ContractViolation(format!(
        "cannot place {:?} cell into a {:?} value set",
        value.kind(),
        self.kind
      )));
    }
    Ok(())
  }

  pub fn value(&self, time: usize, element: usize) -> Result<Scalar> {
    self
      .values
      .get(time)
      .and_then(|row| row.get(element))
      .copied()
      .ok_or_else(|| {
        SimlinkError::ContractViolation(format!(
          "value index ({time}, {element}) outside {} x {} value set",
          self.time_count(),
          self.element_count()
        ))
      })
  }

  /// Overwrite one cell. The row must already exist.
  pub fn set_value(&mut self, time: usize, element: usize, value: Scalar) -> Result<()> {
    self.check_kind(value)?;
    let (times, elements) = (self.time_count(), self.element_count());
    let cell = self
      .values
      .get_mut(time)
      .and_then(|row| row.get_mut(element))
      .ok_or_else(|| {
        SimlinkError::ContractViolation(format!(
          "value index ({time}, {element}) outside {times} x {elements} value set"
        ))
      })?;
    *cell = value;
    Ok(())
  }

  /// Append one row of values for a new time step.
  pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<()> {
    for value in &row {
      self.check_kind(*value)?;
    }
    if !self.values.is_empty() && row.len() != self.element_count() {
      return Err(SimlinkError::ContractViolation(format!(
        "row of {} values appended to value set with {} elements per time",
        row.len(),
        self.element_count()
      )));
    }
    self.values.push(row);
    Ok(())
  }

  /// Append one row of reals.
  pub fn push_real_row(&mut self, row: &[f64]) -> Result<()> {
    self.push_row(row.iter().copied().map(Scalar::Real).collect())
  }

  /// Remove the row at `time`, shifting later rows down.
  pub fn remove_row(&mut self, time: usize) -> Result<()> {
    if time >= self.values.len() {
      return Err(SimlinkError::ContractViolation(format!(
        "row index {time} outside value set of {} rows",
        self.values.len()
      )));
    }
    self.values.remove(time);
    Ok(())
  }

  /// Remove one cell from the row at `time`, shifting that row's later
  /// elements down.
  pub fn remove_element(&mut self, time: usize, element: usize) -> Result<()> {
    let rows = self.values.len();
    let row = self.values.get_mut(time).ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "row index {time} outside value set of {rows} rows"
      ))
    })?;
    if element >= row.len() {
      return Err(SimlinkError::ContractViolation(format!(
        "element index {element} outside row of {} elements",
        row.len()
      )));
    }
    row.remove(element);
    Ok(())
  }

  pub fn clear(&mut self) {
    self.values.clear();
  }

  /// All element values for one time step as reals.
  pub fn row_as_reals(&self, time: usize) -> Result<Vec<f64>> {
    let row = self.values.get(time).ok_or_else(|| {
      SimlinkError::ContractViolation(format!(
        "row index {time} outside value set of {} rows",
        self.values.len()
      ))
    })?;
    Ok(row.iter().map(Scalar::as_real).collect())
  }

  pub fn rows(&self) -> &[Vec<Scalar>] {
    &self.values
  }
}

#[cfg(test)]
#[path = "values_test.rs"]
mod values_test;
