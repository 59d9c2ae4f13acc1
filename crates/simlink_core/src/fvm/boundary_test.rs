use std::sync::Arc;

use approx::assert_relative_eq;

use crate::error::SimlinkError;
use crate::mesh::test_fixtures::two_square_mesh;
use crate::mesh::Grid;
use crate::numeric::{Field, FieldDomain};

use super::*;

fn active_grid() -> Arc<Grid> {
  let mut grid = Grid::new(two_square_mesh());
  grid.activate().unwrap();
  Arc::new(grid)
}

fn ready_boundary(grid: &Arc<Grid>, cell_values: Vec<f64>) -> GradBoundary01 {
  let mut boundary = GradBoundary01::new("phi");
  boundary.set_grid(Arc::clone(grid));
  boundary.set_field(Field::from_scalars("phi", FieldDomain::Cell, cell_values));
  boundary.set_coefficient_value(1.0);
  boundary
}

#[test]
fn test_dirichlet_gradient_contribution() {
  let grid = active_grid();
  let mut boundary = ready_boundary(&grid, vec![0.0, 0.0]);
  boundary.set_default_condition(BoundaryCondition::Dirichlet { value: 3.0 });

  assert!(boundary.validate().is_empty());
  boundary.process().unwrap();

  let result = boundary.result().unwrap();
  let gradients = result.as_vectors().unwrap();

  // Top and bottom contributions cancel; only the outer vertical face of
  // each cell is left: 3.0 through area 1 over volume 1.
  assert_relative_eq!(gradients[0].x, -3.0, epsilon = 1e-9);
  assert_relative_eq!(gradients[0].y, 0.0, epsilon = 1e-9);
  assert_relative_eq!(gradients[1].x, 3.0, epsilon = 1e-9);
  assert_relative_eq!(gradients[1].y, 0.0, epsilon = 1e-9);
}

#[test]
fn test_neumann_face_value_from_cell_and_flux() {
  let grid = active_grid();
  let mut boundary = ready_boundary(&grid, vec![5.0, 5.0]);
  boundary.set_default_condition(BoundaryCondition::Dirichlet { value: 0.0 });
  // The bottom-left face gets a flux condition: gb = area / dist = 2, so
  // the face value is 5 - 2 / (1 * 2) = 4.
  boundary.set_condition(&[0], BoundaryCondition::Neumann { flux: 2.0 });

  boundary.process().unwrap();
  let result = boundary.result().unwrap();
  let gradients = result.as_vectors().unwrap();

  // Cell 0: only the bottom face carries a value, pointing -y.
  assert_relative_eq!(gradients[0].y, -4.0, epsilon = 1e-9);
}

#[test]
fn test_per_face_override_beats_default() {
  let grid = active_grid();
  let mut boundary = ready_boundary(&grid, vec![0.0, 0.0]);
  boundary.set_default_condition(BoundaryCondition::Dirichlet { value: 1.0 });
  boundary.set_condition(&[2], BoundaryCondition::Dirichlet { value: 9.0 });

  assert_eq!(
    boundary.condition(2),
    BoundaryCondition::Dirichlet { value: 9.0 }
  );
  assert_eq!(
    boundary.condition(0),
    BoundaryCondition::Dirichlet { value: 1.0 }
  );
}

#[test]
fn test_unknown_condition_fails() {
  let grid = active_grid();
  let mut boundary = ready_boundary(&grid, vec![0.0, 0.0]);

  // No default, not all boundary faces covered.
  let errors = boundary.validate();
  assert!(errors.iter().any(|e| e.contains("default condition")));

  assert!(matches!(
    boundary.process(),
    Err(SimlinkError::NotImplemented(_))
  ));
}
