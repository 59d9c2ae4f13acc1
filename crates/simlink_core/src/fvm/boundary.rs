//! Explicit gradient boundary operator.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec3;

use crate::error::{Result, SimlinkError};
use crate::mesh::Grid;
use crate::numeric::{Field, FieldDomain, FieldValue};

use super::{
  Boundary, BoundaryCondition, FvmCore, Operator, OperatorMode, OperatorType,
};

pub const BOUNDARY01: &str = "FvcBoundary01";

/// Boundary closure for the cell gradient of a scalar field.
///
/// Per boundary face the condition fixes the face value directly (Dirichlet)
/// or derives it from the adjacent cell value and the flux through the face
/// (Neumann); the face contribution then accumulates into the adjacent
/// cell's gradient as `normal * area * value / volume`.
pub struct GradBoundary01 {
  core: FvmCore,
  variable: String,
  default_condition: BoundaryCondition,
  conditions: HashMap<usize, BoundaryCondition>,
  face_values: HashMap<usize, f64>,
  cell_gradient: Vec<DVec3>,
}

impl GradBoundary01 {
  pub fn new(variable: &str) -> Self {
    Self {
      core: FvmCore::default(),
      variable: variable.to_string(),
      default_condition: BoundaryCondition::Unknown,
      conditions: HashMap::new(),
      face_values: HashMap::new(),
      cell_gradient: Vec::new(),
    }
  }

  fn face_value(&self, grid: &Grid, face_index: usize, cell_values: &[f64]) -> Result<f64> {
    match self.condition(face_index) {
      BoundaryCondition::Dirichlet { value } => Ok(value),
      BoundaryCondition::Neumann { flux } => {
        let face = grid.face(face_index);
        let cell_index = face.cell_indexes[0];
        let distance = grid.cell_to_face_distance(cell_index, face_index);
        let g = face.area / distance;
        let coefficient = self.core.face_coefficient(face_index)?;
        Ok(cell_values[cell_index] - flux / (coefficient * g))
      }
      BoundaryCondition::Unknown => Err(SimlinkError::NotImplemented(format!(
        "boundary face {face_index} has no usable boundary condition"
      ))),
    }
  }
}

impl Operator for GradBoundary01 {
  fn name(&self) -> &str {
    BOUNDARY01
  }

  fn mode(&self) -> OperatorMode {
    OperatorMode::Explicit
  }

  fn operator_type(&self) -> OperatorType {
    OperatorType::Grad
  }

  fn variable(&self) -> &str {
    &self.variable
  }

  fn set_grid(&mut self, grid: Arc<Grid>) {
    self.core.grid = Some(grid);
  }

  fn set_field(&mut self, field: Field) {
    self.core.field = Some(field);
  }

  fn set_coefficient_value(&mut self, value: f64) {
    self.core.coefficient_value = Some(value);
  }

  fn set_coefficient_field(&mut self, field: Field) {
    self.core.coefficient_field = Some(field);
  }

  fn validate(&self) -> Vec<String> {
    let mut errors = self.core.validate_common(BOUNDARY01, &self.variable);

    if let Some(field) = &self.core.field {
      if !matches!(field.values, FieldValue::Scalar(_)) {
        errors.push(format!(
          "boundary [{BOUNDARY01}]: only scalar fields are supported"
        ));
      }
    }

    // Every boundary face must resolve to a condition.
    if let Some(grid) = &self.core.grid {
      if self.default_condition == BoundaryCondition::Unknown {
        let uncovered = grid
          .boundary_faces()
          .into_iter()
          .any(|face| !self.conditions.contains_key(&face));
        if uncovered {
          errors.push(format!(
            "boundary [{BOUNDARY01}]: no default condition and not all boundary faces are covered"
          ));
        }
      }
    }

    errors
  }

  fn process(&mut self) -> Result<()> {
    let grid = Arc::clone(self.core.grid()?);
    let cell_values = self.core.scalar_field()?.as_scalars()?.to_vec();

    self.face_values.clear();
    self.cell_gradient = vec![DVec3::ZERO; grid.num_cells()];

    for face_index in grid.boundary_faces() {
      let value = self.face_value(&grid, face_index, &cell_values)?;
      self.face_values.insert(face_index, value);

      let face = grid.face(face_index);
      let cell_index = face.cell_indexes[0];
      let side = face.cell_sides[0] as f64;
      let cell = grid.cell(cell_index);

      self.cell_gradient[cell_index] +=
        face.normal * side * face.area * value / cell.volume;
    }

    Ok(())
  }

  fn result(&self) -> Option<Field> {
    if self.cell_gradient.is_empty() {
      return None;
    }
    Some(Field {
      variable: self.variable.clone(),
      domain: FieldDomain::Cell,
      values: FieldValue::Vector(self.cell_gradient.clone()),
    })
  }
}

impl Boundary for GradBoundary01 {
  fn set_default_condition(&mut self, condition: BoundaryCondition) {
    self.default_condition = condition;
  }

  fn default_condition(&self) -> BoundaryCondition {
    self.default_condition
  }

  fn set_condition(&mut self, face_indexes: &[usize], condition: BoundaryCondition) {
    for &face_index in face_indexes {
      self.conditions.insert(face_index, condition);
    }
  }

  /// The per-face override, falling back to the default condition.
  fn condition(&self, face_index: usize) -> BoundaryCondition {
    self
      .conditions
      .get(&face_index)
      .copied()
      .unwrap_or(self.default_condition)
  }
}

#[cfg(test)]
#[path = "boundary_test.rs"]
mod boundary_test;
