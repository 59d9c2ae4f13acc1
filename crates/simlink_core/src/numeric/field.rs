//! Fields: one value per mesh node, face or cell.

use glam::{DMat3, DVec3};

use crate::error::{Result, SimlinkError};

/// Which mesh entity a field is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldDomain {
  Node,
  Face,
  Cell,
}

/// Per-entry storage of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
  Scalar(Vec<f64>),
  Vector(Vec<DVec3>),
  Tensor(Vec<DMat3>),
}

impl FieldValue {
  pub fn len(&self) -> usize {
    match self {
      FieldValue::Scalar(v) => v.len(),
      FieldValue::Vector(v) => v.len(),
      FieldValue::Tensor(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A named field over one mesh domain.
#[derive(Clone, Debug)]
pub struct Field {
  pub variable: String,
  pub domain: FieldDomain,
  pub values: FieldValue,
}

impl Field {
  pub fn scalar(variable: impl Into<String>, domain: FieldDomain, len: usize) -> Self {
    Self {
      variable: variable.into(),
      domain,
      values: FieldValue::Scalar(vec![0.0; len]),
    }
  }

  pub fn vector(variable: impl Into<String>, domain: FieldDomain, len: usize) -> Self {
    Self {
      variable: variable.into(),
      domain,
      values: FieldValue::Vector(vec![DVec3::ZERO; len]),
    }
  }

  pub fn from_scalars(variable: impl Into<String>, domain: FieldDomain, values: Vec<f64>) -> Self {
    Self {
      variable: variable.into(),
      domain,
      values: FieldValue::Scalar(values),
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn as_scalars(&self) -> Result<&[f64]> {
    match &self.values {
      FieldValue::Scalar(v) => Ok(v),
      _ => Err(SimlinkError::ContractViolation(format!(
        "field [{}] is not scalar-valued",
        self.variable
      ))),
    }
  }

  pub fn as_vectors(&self) -> Result<&[DVec3]> {
    match &self.values {
      FieldValue::Vector(v) => Ok(v),
      _ => Err(SimlinkError::ContractViolation(format!(
        "field [{}] is not vector-valued",
        self.variable
      ))),
    }
  }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
