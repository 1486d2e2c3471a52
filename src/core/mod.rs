//! Core vector and operator abstractions.

pub mod traits;
pub mod wrappers;

pub use traits::{LevelOperator, LinearOperator, MgVector, compute_inverse_diagonal};
pub use wrappers::DistributedVector;
