//! Small ndarray-like types and numeric primitives used throughout the crate.
//!
//! Provides `Array2` (row-major 2D) and `Array1` (1D) containers with the
//! handful of operations the trainer needs, plus the overflow-guarded
//! sigmoid and gradient clipping in [`ops`].
pub mod matrix;
pub mod ops;
pub mod vector;

pub use matrix::{Array2, ShapeError};
pub use vector::Array1;
