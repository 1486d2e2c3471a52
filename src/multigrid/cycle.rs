//! The V-cycle and its preconditioner adapter.

use crate::core::traits::{LevelOperator, MgVector};
use crate::error::MgError;
use crate::multigrid::coarse::{CoarseSolveSummary, MgCoarseGridSolver};
use crate::multigrid::level::MgLevelObject;
use crate::multigrid::timer::{LevelTimers, MgStage};
use crate::multigrid::transfer::MgTransfer;
use crate::preconditioner::{ChebyshevSmoother, Preconditioner};

/// Run `f` inside the stage timer when instrumentation is on.
fn timed<R>(timers: &mut Option<LevelTimers>, stage: MgStage, level: usize, f: impl FnOnce() -> R) -> R {
    match timers {
        Some(t) => t.time(stage, level, f),
        None => f(),
    }
}

/// Multigrid hierarchy ready to cycle: operators, transfer, one smoother per
/// level above the coarsest, and the coarse-grid solver.
pub struct Multigrid<'a, V, Op, T> {
    operators: &'a MgLevelObject<Op>,
    transfer: &'a T,
    smoothers: Vec<ChebyshevSmoother<V>>,
    coarse: MgCoarseGridSolver<V>,
    defect: MgLevelObject<V>,
    solution: MgLevelObject<V>,
    t: MgLevelObject<V>,
    timers: Option<LevelTimers>,
}

impl<'a, V, Op, T> Multigrid<'a, V, Op, T>
where
    V: MgVector,
    Op: LevelOperator<V>,
    T: MgTransfer<V>,
{
    /// `smoothers[i]` belongs to level `min_level + 1 + i`.
    pub fn new(
        operators: &'a MgLevelObject<Op>,
        transfer: &'a T,
        smoothers: Vec<ChebyshevSmoother<V>>,
        coarse: MgCoarseGridSolver<V>,
        timers: Option<LevelTimers>,
    ) -> Self {
        assert_eq!(smoothers.len(), operators.n_levels() - 1, "one smoother per non-coarsest level");
        let defect = operators.map(|_, op| op.create_vector());
        let solution = defect.clone();
        let t = defect.clone();
        Self { operators, transfer, smoothers, coarse, defect, solution, t, timers }
    }

    pub fn min_level(&self) -> usize {
        self.operators.min_level()
    }

    pub fn max_level(&self) -> usize {
        self.operators.max_level()
    }

    /// z ← one V-cycle applied to r, from a zero initial guess.
    pub fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        let max = self.max_level();
        self.defect[max].copy_from(r);
        self.solution[max].set_zero();
        self.level_v_step(max)?;
        z.copy_from(&self.solution[max]);
        Ok(())
    }

    fn level_v_step(&mut self, level: usize) -> Result<(), MgError> {
        let (operators, transfer) = (self.operators, self.transfer);
        let op = &operators[level];
        if level == self.min_level() {
            let (coarse, solution, defect) = (&mut self.coarse, &mut self.solution[level], &self.defect[level]);
            timed(&mut self.timers, MgStage::CoarseSolve, level, || coarse.solve(op, solution, defect))?;
            return Ok(());
        }
        let smoother = &mut self.smoothers[level - operators.min_level() - 1];

        timed(&mut self.timers, MgStage::PreSmoother, level, || {
            smoother.apply(op, &self.defect[level], &mut self.solution[level])
        })?;

        timed(&mut self.timers, MgStage::Residual, level, || {
            op.matvec(&self.solution[level], &mut self.t[level]);
            self.t[level].sadd(-1.0, 1.0, &self.defect[level]);
        });

        timed(&mut self.timers, MgStage::Restriction, level, || {
            let coarse_defect = &mut self.defect[level - 1];
            coarse_defect.set_zero();
            transfer.restrict_and_add(level, coarse_defect, &self.t[level]);
        });

        self.solution[level - 1].set_zero();
        self.level_v_step(level - 1)?;

        timed(&mut self.timers, MgStage::Prolongation, level, || {
            let (coarse, fine) = self.solution.pair_mut(level);
            transfer.prolongate_and_add(level, fine, coarse);
        });

        if transfer.has_edge_dofs(level) {
            timed(&mut self.timers, MgStage::EdgeProlongation, level, || {
                let (coarse, fine) = self.solution.pair_mut(level);
                transfer.edge_prolongate_and_add(level, fine, coarse);
            });
        }

        let smoother = &mut self.smoothers[level - operators.min_level() - 1];
        timed(&mut self.timers, MgStage::PostSmoother, level, || {
            smoother.smooth(op, &mut self.solution[level], &self.defect[level])
        })
    }

    pub fn timers(&self) -> Option<&LevelTimers> {
        self.timers.as_ref()
    }

    pub fn reset_timers(&mut self) {
        if let Some(t) = &mut self.timers {
            t.reset();
        }
    }

    pub fn smoothers(&self) -> &[ChebyshevSmoother<V>] {
        &self.smoothers
    }

    pub fn coarse_summary(&self) -> CoarseSolveSummary {
        self.coarse.summary()
    }

    pub fn into_timers(self) -> Option<LevelTimers> {
        self.timers
    }
}

/// Exposes one V-cycle per `apply` to a Krylov solver.
pub struct PreconditionMg<'a, V, Op, T> {
    mg: Multigrid<'a, V, Op, T>,
    applications: usize,
}

impl<'a, V, Op, T> PreconditionMg<'a, V, Op, T>
where
    V: MgVector,
    Op: LevelOperator<V>,
    T: MgTransfer<V>,
{
    pub fn new(mg: Multigrid<'a, V, Op, T>) -> Self {
        Self { mg, applications: 0 }
    }

    /// Number of V-cycles run so far.
    pub fn applications(&self) -> usize {
        self.applications
    }

    pub fn multigrid(&self) -> &Multigrid<'a, V, Op, T> {
        &self.mg
    }

    pub fn into_inner(self) -> Multigrid<'a, V, Op, T> {
        self.mg
    }
}

impl<V, Op, T> Preconditioner<V> for PreconditionMg<'_, V, Op, T>
where
    V: MgVector,
    Op: LevelOperator<V>,
    T: MgTransfer<V>,
{
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        self.applications += 1;
        self.mg.apply(r, z)
    }
}
