//! Krylov solver used for the outer iteration and the coarse-grid problem.

pub mod pcg;
pub use pcg::{CgCoefficients, PcgSolver};
