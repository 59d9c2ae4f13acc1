//! Finite-volume operators and boundaries.
//!
//! Operators and boundaries share one contract: they receive a grid, a
//! target field, a coefficient (single value or per-face field) and optional
//! named parameters; `validate` reports setup problems as diagnostics;
//! `process` then fills either an explicit result field or an implicit
//! `(matrix, rhs)` contribution sized by the cell count.
//!
//! Implementations register under their string name ("FvcGrad01",
//! "FvmLaplacian01", "FvcBoundary01") in an [`OperatorRegistry`]. The "Fvc"
//! prefix marks explicit operators updating a field, "Fvm" implicit ones
//! contributing to a linear system.

pub mod boundary;
pub mod grad;
pub mod laplacian;

pub use boundary::GradBoundary01;
pub use grad::GradOperator01;
pub use laplacian::LaplacianOperator01;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SimlinkError};
use crate::mesh::Grid;
use crate::numeric::{Field, SparseMatrix};

/// Whether an operator updates a field or contributes to a linear system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorMode {
  Explicit,
  Implicit,
}

/// The differential term an operator discretizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorType {
  Grad,
  Div,
  Laplacian,
  Curl,
  Ddt,
  Source,
}

/// A named operator parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorParam {
  pub key: String,
  pub value: String,
}

/// An implicit contribution: coefficient matrix and source vector, both
/// sized by the number of cells.
pub type LinearSystem = (SparseMatrix, Vec<f64>);

/// Per-face boundary condition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryCondition {
  /// Fixed value on the face.
  Dirichlet { value: f64 },
  /// Fixed flux through the face.
  Neumann { flux: f64 },
  /// Sentinel for a condition not yet assigned.
  Unknown,
}

/// The shared operator contract.
pub trait Operator: Send {
  fn name(&self) -> &str;
  fn mode(&self) -> OperatorMode;
  fn operator_type(&self) -> OperatorType;

  /// The field variable the operator works on.
  fn variable(&self) -> &str;

  fn parameters_required(&self) -> &[&'static str] {
    &[]
  }

  /// Accept a parameter; unknown keys are ignored.
  fn set_parameter(&mut self, _param: OperatorParam) {}

  fn set_grid(&mut self, grid: Arc<Grid>);
  fn set_field(&mut self, field: Field);
  fn set_coefficient_value(&mut self, value: f64);
  fn set_coefficient_field(&mut self, field: Field);

  /// Setup diagnostics; an empty list means the operator can process.
  fn validate(&self) -> Vec<String>;

  /// Fill the output buffers.
  fn process(&mut self) -> Result<()>;

  /// The updated field of an explicit operator.
  fn result(&self) -> Option<Field> {
    None
  }

  /// The contribution of an implicit operator.
  fn linear_system(&self) -> Option<LinearSystem> {
    None
  }
}

/// The boundary contract: an operator restricted to boundary faces with a
/// default condition plus per-face overrides.
pub trait Boundary: Operator {
  fn set_default_condition(&mut self, condition: BoundaryCondition);
  fn default_condition(&self) -> BoundaryCondition;
  fn set_condition(&mut self, face_indexes: &[usize], condition: BoundaryCondition);
  fn condition(&self, face_index: usize) -> BoundaryCondition;
}

/// Common state every FVM operator drags along: grid, target field,
/// coefficient and accepted parameters.
#[derive(Default)]
pub(crate) struct FvmCore {
  pub grid: Option<Arc<Grid>>,
  pub field: Option<Field>,
  pub coefficient_value: Option<f64>,
  pub coefficient_field: Option<Field>,
  pub params: Vec<OperatorParam>,
}

impl FvmCore {
  /// The diagnostics shared by every operator: grid, field, variable match
  /// and coefficient.
  pub fn validate_common(&self, name: &str, variable: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if self.grid.is_none() {
      errors.push(format!("operator [{name}]: grid is not set"));
    }
    match &self.field {
      None => errors.push(format!("operator [{name}]: field is not set")),
      Some(field) if field.variable != variable => errors.push(format!(
        "operator [{name}]: field [{}] does not match variable [{variable}]",
        field.variable
      )),
      Some(_) => {}
    }
    if self.coefficient_value.is_none() && self.coefficient_field.is_none() {
      errors.push(format!("operator [{name}]: coefficient is not set"));
    }
    errors
  }

  /// Coefficient at one face: the single value, or the per-face field entry.
  pub fn face_coefficient(&self, face_index: usize) -> Result<f64> {
    if let Some(value) = self.coefficient_value {
      return Ok(value);
    }
    let field = self.coefficient_field.as_ref().ok_or_else(|| {
      SimlinkError::ContractViolation("operator coefficient is not set".into())
    })?;
    Ok(field.as_scalars()?[face_index])
  }

  pub fn grid(&self) -> Result<&Arc<Grid>> {
    self
      .grid
      .as_ref()
      .ok_or_else(|| SimlinkError::ContractViolation("operator grid is not set".into()))
  }

  pub fn scalar_field(&self) -> Result<&Field> {
    self
      .field
      .as_ref()
      .ok_or_else(|| SimlinkError::ContractViolation("operator field is not set".into()))
  }
}

type OperatorFactory = fn() -> Box<dyn Operator>;
type BoundaryFactory = fn(&str) -> Box<dyn Boundary>;

/// Name-to-factory registry for operators and boundaries.
pub struct OperatorRegistry {
  operators: HashMap<String, OperatorFactory>,
  boundaries: HashMap<String, BoundaryFactory>,
}

impl OperatorRegistry {
  pub fn empty() -> Self {
    Self {
      operators: HashMap::new(),
      boundaries: HashMap::new(),
    }
  }

  /// A registry with all built-in operators and boundaries registered.
  pub fn with_builtins() -> Self {
    let mut registry = Self::empty();
    registry.register_operator(grad::GRAD01, || Box::new(GradOperator01::new()));
    registry.register_operator(laplacian::LAPLACIAN01, || {
      Box::new(LaplacianOperator01::new())
    });
    registry.register_boundary(boundary::BOUNDARY01, |variable| {
      Box::new(GradBoundary01::new(variable))
    });
    registry
  }

  pub fn register_operator(&mut self, name: &str, factory: OperatorFactory) {
    self.operators.insert(name.to_string(), factory);
  }

  pub fn register_boundary(&mut self, name: &str, factory: BoundaryFactory) {
    self.boundaries.insert(name.to_string(), factory);
  }

  pub fn create_operator(&self, name: &str) -> Result<Box<dyn Operator>> {
    self
      .operators
      .get(name)
      .map(|factory| factory())
      .ok_or_else(|| SimlinkError::Config(format!("unknown operator [{name}]")))
  }

  pub fn create_boundary(&self, name: &str, variable: &str) -> Result<Box<dyn Boundary>> {
    self
      .boundaries
      .get(name)
      .map(|factory| factory(variable))
      .ok_or_else(|| SimlinkError::Config(format!("unknown boundary [{name}]")))
  }

  pub fn operator_names(&self) -> Vec<&str> {
    self.operators.keys().map(String::as_str).collect()
  }
}

impl Default for OperatorRegistry {
  fn default() -> Self {
    Self::with_builtins()
  }
}
