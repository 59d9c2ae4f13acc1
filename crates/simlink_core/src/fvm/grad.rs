//! Explicit cell-gradient operator.

use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

use crate::error::Result;
use crate::mesh::Grid;
use crate::numeric::{Field, FieldDomain, FieldValue};

use super::{FvmCore, Operator, OperatorMode, OperatorType};

pub const GRAD01: &str = "FvcGrad01";

/// Face-interpolating gradient of a scalar cell field.
///
/// Interior face values start as the mean of the two adjacent cells; the
/// cell gradient is the outward-flux sum over cell faces divided by the
/// cell volume. Two correction sweeps nudge skewed interior faces with the
/// averaged gradient before the final accumulation.
#[derive(Default)]
pub struct GradOperator01 {
  core: FvmCore,
  face_values: Vec<f64>,
  face_corrections: Vec<DVec3>,
  cell_gradient: Vec<DVec3>,
}

impl GradOperator01 {
  pub fn new() -> Self {
    Self::default()
  }

  fn generate_face_corrections(&mut self, grid: &Grid) {
    self.face_corrections = (0..grid.num_faces())
      .into_par_iter()
      .map(|i| {
        let face = grid.face(i);
        if face.cell_indexes.len() != 2 {
          return DVec3::ZERO;
        }
        let left = grid.cell(face.cell_indexes[0]).centroid;
        let right = grid.cell(face.cell_indexes[1]).centroid;
        face.centroid - (left + right) / 2.0
      })
      .collect();
  }

  fn generate_face_values(&mut self, grid: &Grid, cell_values: &[f64]) {
    self.face_values = (0..grid.num_faces())
      .into_par_iter()
      .map(|i| {
        let cells = &grid.face(i).cell_indexes;
        if cells.len() == 2 {
          (cell_values[cells[0]] + cell_values[cells[1]]) / 2.0
        } else {
          // Boundary faces are the boundary operator's business.
          0.0
        }
      })
      .collect();
  }

  fn update_cell_gradient(&mut self, grid: &Grid) {
    let face_values = &self.face_values;
    self.cell_gradient = (0..grid.num_cells())
      .into_par_iter()
      .map(|i| {
        let cell = grid.cell(i);
        let mut sum = DVec3::ZERO;
        for &face_index in &cell.face_indexes {
          let face = grid.face(face_index);
          let side = face
            .cell_indexes
            .iter()
            .position(|&c| c == i)
            .map(|slot| face.cell_sides[slot] as f64)
            .unwrap_or(1.0);
          sum += face.normal * side * face.area * face_values[face_index];
        }
        sum / cell.volume
      })
      .collect();
  }

  fn correct_face_values(&mut self, grid: &Grid) {
    let gradients = &self.cell_gradient;
    let corrections = &self.face_corrections;
    let corrected: Vec<f64> = (0..grid.num_faces())
      .into_par_iter()
      .map(|i| {
        let cells = &grid.face(i).cell_indexes;
        if cells.len() != 2 {
          return self.face_values[i];
        }
        let mean_gradient = (gradients[cells[0]] + gradients[cells[1]]) * 0.5;
        self.face_values[i] + mean_gradient.dot(corrections[i])
      })
      .collect();
    self.face_values = corrected;
  }
}

impl Operator for GradOperator01 {
  fn name(&self) -> &str {
    GRAD01
  }

  fn mode(&self) -> OperatorMode {
    OperatorMode::Explicit
  }

  fn operator_type(&self) -> OperatorType {
    OperatorType::Grad
  }

  fn variable(&self) -> &str {
    self.core.field.as_ref().map(|f| f.variable.as_str()).unwrap_or("")
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
    let mut errors = self.core.validate_common(GRAD01, self.variable());
    if let Some(field) = &self.core.field {
      if !matches!(field.values, FieldValue::Scalar(_)) {
        errors.push(format!("operator [{GRAD01}]: only scalar fields are supported"));
      }
    }
    errors
  }

  fn process(&mut self) -> Result<()> {
    let grid = Arc::clone(self.core.grid()?);
    let cell_values = self.core.scalar_field()?.as_scalars()?.to_vec();

    self.generate_face_corrections(&grid);
    self.generate_face_values(&grid, &cell_values);
    self.update_cell_gradient(&grid);

    for _ in 0..2 {
      self.correct_face_values(&grid);
      self.update_cell_gradient(&grid);
    }
    Ok(())
  }

  fn result(&self) -> Option<Field> {
    if self.cell_gradient.is_empty() {
      return None;
    }
    Some(Field {
      variable: self.variable().to_string(),
      domain: FieldDomain::Cell,
      values: FieldValue::Vector(self.cell_gradient.clone()),
    })
  }
}

#[cfg(test)]
#[path = "grad_test.rs"]
mod grad_test;
