//! Implicit Laplacian operator.

use std::sync::Arc;

use crate::error::Result;
use crate::mesh::Grid;
use crate::numeric::{Field, FieldValue, SparseMatrix};

use super::{FvmCore, LinearSystem, Operator, OperatorMode, OperatorType};

pub const LAPLACIAN01: &str = "FvmLaplacian01";

/// Two-point flux discretization of the Laplacian over interior faces.
///
/// Each interior face contributes `g = coefficient * area / distance`
/// between its two cells: `-g` on both diagonals, `+g` on both off-diagonal
/// slots. Boundary-face closure comes from a boundary operator and lands in
/// the source vector.
#[derive(Default)]
pub struct LaplacianOperator01 {
  core: FvmCore,
  system: Option<LinearSystem>,
}

impl LaplacianOperator01 {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Operator for LaplacianOperator01 {
  fn name(&self) -> &str {
    LAPLACIAN01
  }

  fn mode(&self) -> OperatorMode {
    OperatorMode::Implicit
  }

  fn operator_type(&self) -> OperatorType {
    OperatorType::Laplacian
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
    let mut errors = self.core.validate_common(LAPLACIAN01, self.variable());
    if let Some(field) = &self.core.field {
      if !matches!(field.values, FieldValue::Scalar(_)) {
        errors.push(format!(
          "operator [{LAPLACIAN01}]: only scalar fields are supported"
        ));
      }
    }
    errors
  }

  fn process(&mut self) -> Result<()> {
    let grid = Arc::clone(self.core.grid()?);
    let cells = grid.num_cells();

    let mut matrix = SparseMatrix::new(cells, cells);
    let rhs = vec![0.0; cells];

    for face_index in 0..grid.num_faces() {
      let face = grid.face(face_index);
      if face.cell_indexes.len() != 2 {
        continue;
      }
      let (a, b) = (face.cell_indexes[0], face.cell_indexes[1]);
      let distance = grid.cell(a).centroid.distance(grid.cell(b).centroid);
      let g = self.core.face_coefficient(face_index)? * face.area / distance;

      matrix.add(a, a, -g)?;
      matrix.add(b, b, -g)?;
      matrix.add(a, b, g)?;
      matrix.add(b, a, g)?;
    }

    self.system = Some((matrix, rhs));
    Ok(())
  }

  fn linear_system(&self) -> Option<LinearSystem> {
    self.system.clone()
  }
}

#[cfg(test)]
#[path = "laplacian_test.rs"]
mod laplacian_test;
