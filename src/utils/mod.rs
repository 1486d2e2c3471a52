//! Shared utilities.

pub mod convergence;
pub use convergence::{ReductionControl, SolveStats, SolverControl, SolverState, StoppingCriterion};
