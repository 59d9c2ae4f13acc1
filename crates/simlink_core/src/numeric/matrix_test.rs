use super::*;

#[test]
fn test_get_set_and_default_zero() {
  let mut m = SparseMatrix::new(3, 4);
  assert_eq!(m.at(2, 3).unwrap(), 0.0);

  m.set(2, 3, 1.5).unwrap();
  assert_eq!(m.at(2, 3).unwrap(), 1.5);
  assert_eq!(m.non_zero_count(), 1);

  m.set(2, 3, 0.0).unwrap();
  assert_eq!(m.non_zero_count(), 0);
}

#[test]
fn test_out_of_bounds_fails() {
  let mut m = SparseMatrix::new(2, 2);
  assert!(matches!(
    m.at(2, 0),
    Err(crate::error::SimlinkError::Bounds { .. })
  ));
  assert!(m.set(0, 5, 1.0).is_err());
}

#[test]
fn test_product() {
  let mut m = SparseMatrix::new(2, 3);
  m.set(0, 0, 1.0).unwrap();
  m.set(0, 2, 2.0).unwrap();
  m.set(1, 1, 3.0).unwrap();

  let y = m.product(&[1.0, 2.0, 3.0]).unwrap();
  assert_eq!(y, vec![7.0, 6.0]);

  assert!(m.product(&[1.0]).is_err());
}

#[test]
fn test_row_helpers() {
  let mut m = SparseMatrix::new(2, 3);
  m.set_row(0, &[(0, 2.0), (1, 4.0)]).unwrap();
  assert_eq!(m.row_sum(0), 6.0);

  m.scale_row(0, 0.5);
  assert_eq!(m.at(0, 0).unwrap(), 1.0);
  assert_eq!(m.at(0, 1).unwrap(), 2.0);
  assert_eq!(m.row_sum(1), 0.0);
}
