//! Level operator implementations.
//!
//! Two structurally different representations satisfy the same
//! [`LevelOperator`](crate::core::LevelOperator) contract, chosen when the
//! hierarchy is built:
//! - [`CsrLevelOperator`]: an assembled sparse matrix, which also unlocks the
//!   algebraic multigrid coarse solver.
//! - [`MatrixFreeOperator`]: a user kernel computing the action of the operator
//!   on the fly, with a precomputed diagonal.

pub mod csr;
pub mod matrix_free;

pub use csr::CsrLevelOperator;
pub use matrix_free::MatrixFreeOperator;
