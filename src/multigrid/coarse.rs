//! Solver for the coarsest level of the hierarchy.
//!
//! Every strategy runs CG to `max(abstol, reltol · |r0|)`; they differ only in
//! the preconditioner handed to it.

use crate::config::{CoarseSettings, CoarseSolverKind, SmootherSettings};
use crate::core::traits::{LevelOperator, MgVector};
use crate::error::MgError;
use crate::preconditioner::{ChebyshevConfig, ChebyshevPreconditioner, ChebyshevSmoother, PreconditionIdentity};
use crate::solver::PcgSolver;
use crate::utils::convergence::{ReductionControl, SolveStats};

#[cfg(feature = "amg")]
use crate::preconditioner::AmgPreconditioner;

/// Running totals over all coarse solves of one outer solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CoarseSolveSummary {
    pub solves: usize,
    pub total_iterations: usize,
    pub failures: usize,
}

pub enum CoarsePreconditioner<V> {
    Identity,
    Chebyshev(ChebyshevSmoother<V>),
    #[cfg(feature = "amg")]
    Amg(AmgPreconditioner),
}

pub struct MgCoarseGridSolver<V> {
    level: usize,
    maxiter: usize,
    abstol: f64,
    reltol: f64,
    preconditioner: CoarsePreconditioner<V>,
    summary: CoarseSolveSummary,
}

impl<V: MgVector> MgCoarseGridSolver<V> {
    /// Set up the strategy selected in `coarse` for the operator on `level`.
    ///
    /// The AMG strategy needs `op.assembled_matrix()`; a matrix-free coarse
    /// operator is rejected before anything is computed.
    pub fn new<Op: LevelOperator<V> + ?Sized>(
        level: usize,
        op: &Op,
        coarse: &CoarseSettings,
        smoother: &SmootherSettings,
    ) -> Result<Self, MgError> {
        let preconditioner = match coarse.kind {
            CoarseSolverKind::Plain => CoarsePreconditioner::Identity,
            CoarseSolverKind::Chebyshev => {
                let config = ChebyshevConfig {
                    degree: smoother.degree,
                    smoothing_range: smoother.smoothing_range,
                    eig_cg_n_iterations: smoother.eig_cg_n_iterations,
                    max_eigenvalue: None,
                };
                CoarsePreconditioner::Chebyshev(ChebyshevSmoother::for_operator(level, op, config))
            }
            CoarseSolverKind::Amg => Self::amg_preconditioner(level, op, coarse)?,
        };
        Ok(Self {
            level,
            maxiter: coarse.maxiter,
            abstol: coarse.abstol,
            reltol: coarse.reltol,
            preconditioner,
            summary: CoarseSolveSummary::default(),
        })
    }

    #[cfg(feature = "amg")]
    fn amg_preconditioner<Op: LevelOperator<V> + ?Sized>(
        level: usize,
        op: &Op,
        coarse: &CoarseSettings,
    ) -> Result<CoarsePreconditioner<V>, MgError> {
        let matrix = op.assembled_matrix().ok_or(MgError::AssembledMatrixRequired { level })?;
        let settings = coarse.amg.ok_or(MgError::AmgUnavailable)?;
        Ok(CoarsePreconditioner::Amg(AmgPreconditioner::new(matrix, settings)?))
    }

    #[cfg(not(feature = "amg"))]
    fn amg_preconditioner<Op: LevelOperator<V> + ?Sized>(
        _level: usize,
        _op: &Op,
        _coarse: &CoarseSettings,
    ) -> Result<CoarsePreconditioner<V>, MgError> {
        Err(MgError::AmgUnavailable)
    }

    /// Solve `A x = b` on the coarsest level; `x` is used as initial guess.
    pub fn solve<Op: LevelOperator<V> + ?Sized>(&mut self, op: &Op, x: &mut V, b: &V) -> Result<SolveStats, MgError> {
        let control = ReductionControl::new(self.maxiter, self.abstol, self.reltol);
        let mut cg = PcgSolver::new(control);
        let stats = match &mut self.preconditioner {
            CoarsePreconditioner::Identity => cg.solve(op, &mut PreconditionIdentity, b, x)?,
            CoarsePreconditioner::Chebyshev(smoother) => {
                let mut pc = ChebyshevPreconditioner { op, smoother };
                cg.solve(op, &mut pc, b, x)?
            }
            #[cfg(feature = "amg")]
            CoarsePreconditioner::Amg(amg) => cg.solve(op, amg, b, x)?,
        };

        self.summary.solves += 1;
        self.summary.total_iterations += stats.iterations;
        if stats.converged {
            log::debug!("coarse solve on level {}: {} iterations, converged", self.level, stats.iterations);
        } else {
            self.summary.failures += 1;
            log::debug!("coarse solve on level {}: {} iterations, failed", self.level, stats.iterations);
            log::warn!(
                "coarse-grid solver on level {} did not converge in {} iterations (residual {:e})",
                self.level,
                stats.iterations,
                stats.final_residual
            );
        }
        Ok(stats)
    }

    pub fn summary(&self) -> CoarseSolveSummary {
        self.summary
    }

    pub fn preconditioner(&self) -> &CoarsePreconditioner<V> {
        &self.preconditioner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MgSolverParameters;
    use crate::core::traits::LinearOperator;
    use crate::matrix::CsrMatrix;
    use crate::operator::CsrLevelOperator;

    fn settings(kind: &str) -> crate::config::MgSettings {
        let mut params = MgSolverParameters::default();
        params.coarse_solver.kind = kind.to_string();
        params.coarse_solver.reltol = 1e-10;
        params.resolve().unwrap()
    }

    fn check_solves(kind: &str) -> CoarseSolveSummary {
        let n = 15;
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0));
        let s = settings(kind);
        let mut coarse = MgCoarseGridSolver::new(0, &op, &s.coarse, &s.smoother).unwrap();
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let stats = coarse.solve(&op, &mut x, &b).unwrap();
        assert!(stats.converged, "{} coarse solve failed", kind);
        let mut ax = vec![0.0; n];
        op.matvec(&x, &mut ax);
        let res: f64 = ax.iter().zip(&b).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt();
        assert!(res < 1e-8 * (n as f64).sqrt());
        coarse.summary()
    }

    #[test]
    fn plain_strategy() {
        let summary = check_solves("plain");
        assert_eq!(summary.solves, 1);
        assert_eq!(summary.failures, 0);
    }

    #[test]
    fn chebyshev_strategy() {
        check_solves("preconditioned-by-smoother");
    }

    #[cfg(feature = "amg")]
    #[test]
    fn amg_strategy() {
        check_solves("preconditioned-by-algebraic-multigrid");
    }

    #[cfg(feature = "amg")]
    #[test]
    fn amg_needs_assembled_matrix() {
        use crate::operator::MatrixFreeOperator;
        let op = MatrixFreeOperator::new(
            |src: &[f64], dst: &mut [f64]| dst.copy_from_slice(src),
            vec![1.0; 4],
        );
        let s = settings("cg_with_amg");
        let err = MgCoarseGridSolver::new(2, &op, &s.coarse, &s.smoother).err().unwrap();
        assert!(matches!(err, MgError::AssembledMatrixRequired { level: 2 }));
    }

    #[test]
    fn failures_are_counted_not_raised() {
        let n = 20;
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0));
        let mut s = settings("cg");
        s.coarse.maxiter = 2;
        let mut coarse = MgCoarseGridSolver::new(0, &op, &s.coarse, &s.smoother).unwrap();
        let mut x = vec![0.0; n];
        let stats = coarse.solve(&op, &mut x, &vec![1.0; n]).unwrap();
        assert!(!stats.converged);
        assert_eq!(coarse.summary().failures, 1);
        assert_eq!(coarse.summary().total_iterations, 2);
    }
}
