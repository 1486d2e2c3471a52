//! Configuration of the multigrid solver.

pub mod options;
pub use options::{
    AmgSettings, AmgSmootherKind, CoarseSettings, CoarseSolverKind, CoarseSolverParameters,
    MgSettings, MgSolverParameters, SmootherKind, SmootherParameters, SmootherSettings,
};
