use super::*;

#[test]
fn test_push_and_read_rows() {
  let mut set = ValueSet2D::new(ScalarKind::Real, None);
  set.push_real_row(&[1.0, 2.0, 3.0]).unwrap();
  set.push_real_row(&[4.0, 5.0, 6.0]).unwrap();

  assert_eq!(set.time_count(), 2);
  assert_eq!(set.element_count(), 3);
  assert_eq!(set.value(1, 2).unwrap().as_real(), 6.0);
  assert_eq!(set.row_as_reals(0).unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_kind_mismatch_is_rejected() {
  let mut set = ValueSet2D::new(ScalarKind::Real, None);
  set.push_real_row(&[0.0]).unwrap();

  let err = set.set_value(0, 0, Scalar::Int(3)).unwrap_err();
  assert!(matches!(err, crate::error::SimlinkError::ContractViolation(_)));

  let mut ints = ValueSet2D::new(ScalarKind::Int, None);
  assert!(ints.push_row(vec![Scalar::Int(1)]).is_ok());
  assert!(ints.push_row(vec![Scalar::Real(1.0)]).is_err());
}

#[test]
fn test_ragged_row_is_rejected() {
  let mut set = ValueSet2D::new(ScalarKind::Real, None);
  set.push_real_row(&[1.0, 2.0]).unwrap();
  assert!(set.push_real_row(&[1.0]).is_err());
}

#[test]
fn test_remove_row_shifts_indices() {
  let mut set = ValueSet2D::new(ScalarKind::Real, None);
  set.push_real_row(&[1.0]).unwrap();
  set.push_real_row(&[2.0]).unwrap();
  set.push_real_row(&[3.0]).unwrap();

  set.remove_row(0).unwrap();
  assert_eq!(set.value(0, 0).unwrap().as_real(), 2.0);
  assert_eq!(set.time_count(), 2);
}

#[test]
fn test_remove_element_shifts_row() {
  let mut set = ValueSet2D::new(ScalarKind::Real, None);
  set.push_real_row(&[1.0, 2.0, 3.0]).unwrap();
  set.push_real_row(&[4.0, 5.0, 6.0]).unwrap();

  set.remove_element(0, 1).unwrap();
  assert_eq!(set.row_as_reals(0).unwrap(), vec![1.0, 3.0]);
  // Other rows are untouched.
  assert_eq!(set.row_as_reals(1).unwrap(), vec![4.0, 5.0, 6.0]);

  assert!(set.remove_element(0, 5).is_err());
  assert!(set.remove_element(9, 0).is_err());
}

#[test]
fn test_out_of_range_read() {
  let set = ValueSet2D::new(ScalarKind::Real, None);
  assert!(set.value(0, 0).is_err());
}
