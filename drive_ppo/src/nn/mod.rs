//! Neural network building blocks.

pub mod orthogonal;

pub use orthogonal::{orthogonal_matrix, OrthogonalLinear, OrthogonalLinearConfig};
