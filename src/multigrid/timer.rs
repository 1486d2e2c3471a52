//! Wall-clock accumulators for the stages of a V-cycle.

use std::time::{Duration, Instant};

/// The seven instrumented stages, in the order a V-cycle runs them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MgStage {
    PreSmoother,
    Residual,
    Restriction,
    CoarseSolve,
    Prolongation,
    EdgeProlongation,
    PostSmoother,
}

impl MgStage {
    pub const ALL: [MgStage; 7] = [
        MgStage::PreSmoother,
        MgStage::Residual,
        MgStage::Restriction,
        MgStage::CoarseSolve,
        MgStage::Prolongation,
        MgStage::EdgeProlongation,
        MgStage::PostSmoother,
    ];

    /// Column name used in diagnostics tables.
    pub fn label(self) -> &'static str {
        match self {
            MgStage::PreSmoother => "pre_smoother_step",
            MgStage::Residual => "residual_step",
            MgStage::Restriction => "restriction",
            MgStage::CoarseSolve => "coarse_solve",
            MgStage::Prolongation => "prolongation",
            MgStage::EdgeProlongation => "edge_prolongation",
            MgStage::PostSmoother => "post_smoother_step",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    total: Duration,
    started: Option<Instant>,
}

/// One accumulator per stage and level.
#[derive(Clone, Debug)]
pub struct LevelTimers {
    min_level: usize,
    levels: Vec<[Accumulator; 7]>,
}

impl LevelTimers {
    pub fn new(min_level: usize, max_level: usize) -> Self {
        assert!(min_level <= max_level);
        Self { min_level, levels: vec![[Accumulator::default(); 7]; max_level - min_level + 1] }
    }

    fn slot(&mut self, stage: MgStage, level: usize) -> &mut Accumulator {
        &mut self.levels[level - self.min_level][stage.index()]
    }

    pub fn start(&mut self, stage: MgStage, level: usize) {
        let slot = self.slot(stage, level);
        if slot.started.is_some() {
            log::warn!("timer {} on level {} restarted while running", stage.label(), level);
        }
        slot.started = Some(Instant::now());
    }

    pub fn stop(&mut self, stage: MgStage, level: usize) {
        let slot = self.slot(stage, level);
        match slot.started.take() {
            Some(t0) => slot.total += t0.elapsed(),
            None => log::warn!("timer {} on level {} stopped without start", stage.label(), level),
        }
    }

    /// Run `f` between a paired start and stop.
    pub fn time<R>(&mut self, stage: MgStage, level: usize, f: impl FnOnce() -> R) -> R {
        self.start(stage, level);
        let out = f();
        self.stop(stage, level);
        out
    }

    pub fn elapsed(&self, stage: MgStage, level: usize) -> Duration {
        self.levels[level - self.min_level][stage.index()].total
    }

    pub fn seconds(&self, stage: MgStage, level: usize) -> f64 {
        self.elapsed(stage, level).as_secs_f64()
    }

    pub fn is_running(&self, stage: MgStage, level: usize) -> bool {
        self.levels[level - self.min_level][stage.index()].started.is_some()
    }

    pub fn reset(&mut self) {
        for level in &mut self.levels {
            *level = [Accumulator::default(); 7];
        }
    }

    pub fn min_level(&self) -> usize {
        self.min_level
    }

    pub fn max_level(&self) -> usize {
        self.min_level + self.levels.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_resets() {
        let mut timers = LevelTimers::new(1, 3);
        timers.time(MgStage::Residual, 2, || std::thread::sleep(Duration::from_millis(2)));
        let first = timers.elapsed(MgStage::Residual, 2);
        assert!(first >= Duration::from_millis(2));
        timers.time(MgStage::Residual, 2, || ());
        assert!(timers.elapsed(MgStage::Residual, 2) >= first);
        assert_eq!(timers.elapsed(MgStage::Residual, 3), Duration::ZERO);
        assert!(!timers.is_running(MgStage::Residual, 2));
        timers.reset();
        assert_eq!(timers.elapsed(MgStage::Residual, 2), Duration::ZERO);
    }

    #[test]
    fn unmatched_stop_is_ignored() {
        let mut timers = LevelTimers::new(0, 0);
        timers.stop(MgStage::CoarseSolve, 0);
        assert_eq!(timers.elapsed(MgStage::CoarseSolve, 0), Duration::ZERO);
    }

    #[test]
    fn labels_are_distinct() {
        let mut labels: Vec<_> = MgStage::ALL.iter().map(|s| s.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 7);
    }
}
