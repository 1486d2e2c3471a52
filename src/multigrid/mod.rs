//! Geometric multigrid as a CG preconditioner.
//!
//! A hierarchy is an [`MgLevelObject`] of level operators plus an
//! [`MgTransfer`] between neighbouring levels. [`MgSolver`] (or the one-shot
//! [`mg_solve`]) wires them to Chebyshev smoothers and a coarse-grid solver and
//! runs the outer CG iteration.

pub mod coarse;
pub mod cycle;
pub mod diagnostics;
pub mod eigen;
pub mod level;
pub mod solve;
pub mod timer;
pub mod transfer;

pub use coarse::{CoarsePreconditioner, CoarseSolveSummary, MgCoarseGridSolver};
pub use cycle::{Multigrid, PreconditionMg};
pub use diagnostics::{CollectingSink, DiagnosticsSink, LevelDiagnostics, MgDiagnostics, TextTableSink};
pub use eigen::{EigenvalueEstimate, estimate_eigenvalues};
pub use level::MgLevelObject;
pub use solve::{MAX_EIGENVALUE_SAFETY_FACTOR, MgSolveReport, MgSolver, mg_solve};
pub use timer::{LevelTimers, MgStage};
pub use transfer::{MatrixTransfer, MgTransfer};
