//! mgsolve: geometric multigrid preconditioned CG
//!
//! This crate runs conjugate gradients preconditioned by multigrid V-cycles
//! over a user-supplied level hierarchy. Smoothing uses Chebyshev iteration with
//! eigenvalue bounds estimated per level. The coarsest level is solved by CG,
//! either plain or preconditioned by Chebyshev or algebraic multigrid. Vectors
//! may be serial or distributed over processes.

pub mod parallel;

pub mod config;
pub mod core;
pub mod error;
pub mod matrix;
pub mod multigrid;
pub mod operator;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use core::*;
pub use error::*;
pub use matrix::*;
pub use multigrid::*;
pub use operator::*;
pub use parallel::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;
