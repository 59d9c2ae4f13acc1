//! Shared numeric primitives: sparse matrices and per-domain fields.

pub mod field;
pub mod matrix;

pub use field::{Field, FieldDomain, FieldValue};
pub use matrix::SparseMatrix;
