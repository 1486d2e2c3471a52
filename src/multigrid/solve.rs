//! Multigrid-preconditioned CG: the entry point of the crate.
//!
//! One solve resolves the configuration, estimates the smoother bounds on
//! every level above the coarsest, sets up smoothers and the coarse-grid
//! solver, and runs CG on the finest level with one V-cycle per iteration.
//! Configuration problems are returned as errors before any operator is
//! applied; non-convergence is reported through the stopping criterion.

use crate::config::{CoarseSolverKind, MgSettings, MgSolverParameters};
use crate::core::traits::{LevelOperator, LinearOperator, MgVector};
use crate::error::MgError;
use crate::multigrid::coarse::{CoarseSolveSummary, MgCoarseGridSolver};
use crate::multigrid::cycle::{Multigrid, PreconditionMg};
use crate::multigrid::diagnostics::{DiagnosticsSink, MgDiagnostics};
use crate::multigrid::eigen::EigenvalueEstimate;
use crate::multigrid::level::MgLevelObject;
use crate::multigrid::timer::LevelTimers;
use crate::multigrid::transfer::MgTransfer;
use crate::preconditioner::{ChebyshevConfig, ChebyshevSmoother};
use crate::solver::PcgSolver;
use crate::utils::convergence::{SolveStats, StoppingCriterion};

/// Margin applied to the estimated largest eigenvalue before it is handed to
/// the smoother.
pub const MAX_EIGENVALUE_SAFETY_FACTOR: f64 = 1.1;

/// Outcome of one multigrid-preconditioned solve.
#[derive(Debug, Clone)]
pub struct MgSolveReport {
    pub stats: SolveStats,
    /// Timing table; present on rank 0 when `log_levels` is set.
    pub diagnostics: Option<MgDiagnostics>,
    /// Raw estimates per level (unset on the coarsest), when estimation is on.
    pub eigenvalues: Option<MgLevelObject<EigenvalueEstimate>>,
    /// Largest raw estimate over all levels.
    pub max_eigenvalue: Option<f64>,
    pub coarse: CoarseSolveSummary,
    pub preconditioner_applications: usize,
    /// Whether the estimates came from the cache instead of being recomputed.
    pub eigenvalues_reused: bool,
}

#[derive(Debug, Clone)]
struct EigenvalueCache {
    sizes: MgLevelObject<usize>,
    estimates: MgLevelObject<EigenvalueEstimate>,
}

/// Reusable solver; keeps eigenvalue estimates between solves when
/// `cache_eigenvalues` is set.
#[derive(Debug, Clone)]
pub struct MgSolver {
    settings: MgSettings,
    cache: Option<EigenvalueCache>,
}

impl MgSolver {
    pub fn new(params: &MgSolverParameters) -> Result<Self, MgError> {
        Ok(Self::from_settings(params.resolve()?))
    }

    pub fn from_settings(settings: MgSettings) -> Self {
        Self { settings, cache: None }
    }

    pub fn settings(&self) -> &MgSettings {
        &self.settings
    }

    pub fn has_cached_eigenvalues(&self) -> bool {
        self.cache.is_some()
    }

    /// Forget cached estimates; the next solve recomputes them.
    pub fn invalidate_eigenvalue_cache(&mut self) {
        self.cache = None;
    }

    /// Solve `A x = b` with `A` the finest level operator.
    pub fn solve<V, Op, T, C>(
        &mut self,
        control: &mut C,
        dst: &mut V,
        src: &V,
        operators: &MgLevelObject<Op>,
        transfer: &T,
    ) -> Result<MgSolveReport, MgError>
    where
        V: MgVector,
        Op: LevelOperator<V>,
        T: MgTransfer<V>,
        C: StoppingCriterion,
    {
        let fine = &operators[operators.max_level()];
        self.solve_with_system_matrix(control, fine, dst, src, operators, transfer)
    }

    /// Like [`solve`](Self::solve), but iterates on a separate system operator
    /// (e.g. the assembled fine matrix while the hierarchy is matrix-free).
    pub fn solve_with_system_matrix<V, A, Op, T, C>(
        &mut self,
        control: &mut C,
        system: &A,
        dst: &mut V,
        src: &V,
        operators: &MgLevelObject<Op>,
        transfer: &T,
    ) -> Result<MgSolveReport, MgError>
    where
        V: MgVector,
        A: LinearOperator<V> + ?Sized,
        Op: LevelOperator<V>,
        T: MgTransfer<V>,
        C: StoppingCriterion,
    {
        self.run(control, system, dst, src, operators, None, transfer)
    }

    /// Like [`solve`](Self::solve), with caller-supplied inverse diagonals as
    /// the smoothers' inner preconditioners on levels above the coarsest.
    ///
    /// `inverse_diagonals` must cover `min_level + 1..=max_level` of
    /// `operators`; an entry for the coarsest level is allowed and ignored.
    pub fn solve_with_smoother_preconditioners<V, Op, T, C>(
        &mut self,
        control: &mut C,
        dst: &mut V,
        src: &V,
        operators: &MgLevelObject<Op>,
        inverse_diagonals: &MgLevelObject<V>,
        transfer: &T,
    ) -> Result<MgSolveReport, MgError>
    where
        V: MgVector,
        Op: LevelOperator<V>,
        T: MgTransfer<V>,
        C: StoppingCriterion,
    {
        let fine = &operators[operators.max_level()];
        self.run(control, fine, dst, src, operators, Some(inverse_diagonals), transfer)
    }

    #[allow(clippy::too_many_arguments)]
    fn run<V, A, Op, T, C>(
        &mut self,
        control: &mut C,
        system: &A,
        dst: &mut V,
        src: &V,
        operators: &MgLevelObject<Op>,
        inverse_diagonals: Option<&MgLevelObject<V>>,
        transfer: &T,
    ) -> Result<MgSolveReport, MgError>
    where
        V: MgVector,
        A: LinearOperator<V> + ?Sized,
        Op: LevelOperator<V>,
        T: MgTransfer<V>,
        C: StoppingCriterion,
    {
        let settings = self.settings;
        let (min, max) = (operators.min_level(), operators.max_level());
        let rank0 = src.process_rank() == 0;
        validate_hierarchy(dst, src, operators, transfer)?;
        if settings.coarse.kind == CoarseSolverKind::Amg && operators[min].assembled_matrix().is_none() {
            return Err(MgError::AssembledMatrixRequired { level: min });
        }
        if let Some(inverse_diagonals) = inverse_diagonals {
            validate_smoother_preconditioners(operators, inverse_diagonals)?;
        }

        let smoother_config = ChebyshevConfig {
            degree: settings.smoother.degree,
            smoothing_range: settings.smoother.smoothing_range,
            eig_cg_n_iterations: settings.smoother.eig_cg_n_iterations,
            max_eigenvalue: None,
        };
        let mut smoothers: Vec<ChebyshevSmoother<V>> = ((min + 1)..=max)
            .map(|level| match inverse_diagonals {
                Some(inv) => ChebyshevSmoother::new(level, smoother_config, inv[level].clone()),
                None => ChebyshevSmoother::for_operator(level, &operators[level], smoother_config),
            })
            .collect();

        let mut eigenvalues = None;
        let mut max_eigenvalue = None;
        let mut eigenvalues_reused = false;
        if settings.estimate_eigenvalues {
            let templates = operators.map(|_, op| op.create_vector());
            let sizes = templates.map(|_, v| v.local_len());
            let cached = self
                .cache
                .as_ref()
                .filter(|c| settings.cache_eigenvalues && c.sizes == sizes)
                .map(|c| c.estimates.clone());
            let estimates = match cached {
                Some(estimates) => {
                    log::debug!("reusing cached eigenvalue estimates on levels {}..={}", min + 1, max);
                    eigenvalues_reused = true;
                    estimates
                }
                None => {
                    let mut estimates = MgLevelObject::new(min, max, |_| EigenvalueEstimate::UNSET);
                    for (smoother, level) in smoothers.iter().zip((min + 1)..=max) {
                        estimates[level] = smoother.estimate_eigenvalues(&operators[level], &templates[level])?;
                    }
                    estimates
                }
            };
            for (smoother, level) in smoothers.iter_mut().zip((min + 1)..=max) {
                let bound = MAX_EIGENVALUE_SAFETY_FACTOR * estimates[level].max;
                log::debug!(
                    "level {}: Chebyshev interval [{:e}, {:e}]",
                    level,
                    bound / settings.smoother.smoothing_range,
                    bound
                );
                smoother.set_max_eigenvalue(bound);
            }
            max_eigenvalue = estimates.iter().filter(|(_, e)| e.is_set()).map(|(_, e)| e.max).reduce(f64::max);
            if let (true, Some(ev)) = (rank0, max_eigenvalue) {
                log::info!("Max EV on all MG levels: {:e}", ev);
            }
            self.cache = settings
                .cache_eigenvalues
                .then(|| EigenvalueCache { sizes, estimates: estimates.clone() });
            eigenvalues = Some(estimates);
        }

        let coarse = MgCoarseGridSolver::new(min, &operators[min], &settings.coarse, &settings.smoother)?;
        let timers = settings.log_levels.then(|| LevelTimers::new(min, max));
        let mut preconditioner = PreconditionMg::new(Multigrid::new(operators, transfer, smoothers, coarse, timers));

        let mut cg = PcgSolver::new(&mut *control);
        let stats = cg.solve(system, &mut preconditioner, src, dst)?;
        if rank0 {
            log::info!("outer CG: {} iterations, residual {:e}", stats.iterations, stats.final_residual);
        }
        if !stats.converged {
            log::warn!(
                "outer CG stopped after {} iterations without convergence (residual {:e})",
                stats.iterations,
                stats.final_residual
            );
        }

        let preconditioner_applications = preconditioner.applications();
        let mg = preconditioner.into_inner();
        let coarse_summary = mg.coarse_summary();
        let diagnostics = match mg.into_timers() {
            Some(timers) if rank0 => Some(MgDiagnostics::collect(&timers, eigenvalues.as_ref(), max_eigenvalue)),
            _ => None,
        };

        Ok(MgSolveReport {
            stats,
            diagnostics,
            eigenvalues,
            max_eigenvalue,
            coarse: coarse_summary,
            preconditioner_applications,
            eigenvalues_reused,
        })
    }
}

fn validate_hierarchy<V, Op, T>(dst: &V, src: &V, operators: &MgLevelObject<Op>, transfer: &T) -> Result<(), MgError>
where
    V: MgVector,
    T: MgTransfer<V>,
{
    if dst.local_len() != src.local_len() {
        return Err(MgError::InvalidHierarchy(format!(
            "solution has {} local entries, right-hand side {}",
            dst.local_len(),
            src.local_len()
        )));
    }
    if let Some((tmin, tmax)) = transfer.level_range() {
        if (tmin, tmax) != (operators.min_level(), operators.max_level()) {
            return Err(MgError::InvalidHierarchy(format!(
                "operators cover levels {:?}, transfer covers {}..={}",
                operators.levels(),
                tmin,
                tmax
            )));
        }
    }
    Ok(())
}

fn validate_smoother_preconditioners<V, Op>(
    operators: &MgLevelObject<Op>,
    inverse_diagonals: &MgLevelObject<V>,
) -> Result<(), MgError>
where
    V: MgVector,
    Op: LevelOperator<V>,
{
    let (min, max) = (operators.min_level(), operators.max_level());
    if max > min && (inverse_diagonals.min_level() > min + 1 || inverse_diagonals.max_level() != max) {
        return Err(MgError::InvalidHierarchy(format!(
            "smoother preconditioners cover levels {:?}, smoothers need {}..={}",
            inverse_diagonals.levels(),
            min + 1,
            max
        )));
    }
    for level in (min + 1)..=max {
        let expected = operators[level].create_vector().local_len();
        let found = inverse_diagonals[level].local_len();
        if found != expected {
            return Err(MgError::InvalidHierarchy(format!(
                "smoother preconditioner on level {} has {} local entries, operator {}",
                level, found, expected
            )));
        }
    }
    Ok(())
}

/// One fresh multigrid solve; the diagnostics table goes to `sink` on rank 0.
pub fn mg_solve<V, Op, T, C, S>(
    control: &mut C,
    dst: &mut V,
    src: &V,
    params: &MgSolverParameters,
    operators: &MgLevelObject<Op>,
    transfer: &T,
    sink: &mut S,
) -> Result<MgSolveReport, MgError>
where
    V: MgVector,
    Op: LevelOperator<V>,
    T: MgTransfer<V>,
    C: StoppingCriterion,
    S: DiagnosticsSink + ?Sized,
{
    let mut solver = MgSolver::new(params)?;
    let report = solver.solve(control, dst, src, operators, transfer)?;
    if src.process_rank() == 0 {
        if let Some(diagnostics) = &report.diagnostics {
            sink.write_diagnostics(diagnostics)?;
        }
    }
    Ok(report)
}
