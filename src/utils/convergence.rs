//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! A stopping criterion is consulted once per iteration with the current
//! residual norm and remembers the last step it saw, so the caller can read the
//! iteration count and final residual back from the same object it passed in.

/// Outcome of one convergence check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    /// Keep iterating.
    Iterate,
    /// Tolerance reached.
    Success,
    /// Iteration cap reached without meeting the tolerance.
    Failure,
}

pub trait StoppingCriterion {
    /// Inspect the residual norm `value` after `step` iterations (step 0 is the initial residual).
    fn check(&mut self, step: usize, value: f64) -> SolverState;
    fn last_step(&self) -> usize;
    fn last_value(&self) -> f64;
}

impl<C: StoppingCriterion + ?Sized> StoppingCriterion for &mut C {
    fn check(&mut self, step: usize, value: f64) -> SolverState {
        (**self).check(step, value)
    }
    fn last_step(&self) -> usize {
        (**self).last_step()
    }
    fn last_value(&self) -> f64 {
        (**self).last_value()
    }
}

/// Absolute tolerance with an iteration cap.
#[derive(Clone, Debug)]
pub struct SolverControl {
    pub max_steps: usize,
    pub tolerance: f64,
    last_step: usize,
    last_value: f64,
    initial_value: f64,
    state: SolverState,
}

impl SolverControl {
    pub fn new(max_steps: usize, tolerance: f64) -> Self {
        Self {
            max_steps,
            tolerance,
            last_step: 0,
            last_value: f64::NAN,
            initial_value: f64::NAN,
            state: SolverState::Iterate,
        }
    }

    /// Absolute tolerance `factor · rhs_norm`.
    pub fn scaled(max_steps: usize, factor: f64, rhs_norm: f64) -> Self {
        Self::new(max_steps, factor * rhs_norm)
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn converged(&self) -> bool {
        self.state == SolverState::Success
    }
}

impl StoppingCriterion for SolverControl {
    fn check(&mut self, step: usize, value: f64) -> SolverState {
        if step == 0 {
            self.initial_value = value;
        }
        self.last_step = step;
        self.last_value = value;
        self.state = if value <= self.tolerance {
            SolverState::Success
        } else if step >= self.max_steps || !value.is_finite() {
            SolverState::Failure
        } else {
            SolverState::Iterate
        };
        self.state
    }
    fn last_step(&self) -> usize {
        self.last_step
    }
    fn last_value(&self) -> f64 {
        self.last_value
    }
}

/// Success when the residual drops below `max(tolerance, reduction · initial)`.
#[derive(Clone, Debug)]
pub struct ReductionControl {
    inner: SolverControl,
    pub reduction: f64,
    reduced_tolerance: f64,
}

impl ReductionControl {
    pub fn new(max_steps: usize, tolerance: f64, reduction: f64) -> Self {
        Self {
            inner: SolverControl::new(max_steps, tolerance),
            reduction,
            reduced_tolerance: tolerance,
        }
    }

    pub fn state(&self) -> SolverState {
        self.inner.state
    }

    pub fn initial_value(&self) -> f64 {
        self.inner.initial_value
    }
}

impl StoppingCriterion for ReductionControl {
    fn check(&mut self, step: usize, value: f64) -> SolverState {
        if step == 0 {
            self.reduced_tolerance = self.inner.tolerance.max(self.reduction * value);
        }
        let inner = &mut self.inner;
        if step == 0 {
            inner.initial_value = value;
        }
        inner.last_step = step;
        inner.last_value = value;
        inner.state = if value <= self.reduced_tolerance {
            SolverState::Success
        } else if step >= inner.max_steps || !value.is_finite() {
            SolverState::Failure
        } else {
            SolverState::Iterate
        };
        inner.state
    }
    fn last_step(&self) -> usize {
        self.inner.last_step
    }
    fn last_value(&self) -> f64 {
        self.inner.last_value
    }
}

#[derive(Clone, Debug)]
pub struct SolveStats {
    pub iterations: usize,
    pub final_residual: f64,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_control() {
        let mut control = SolverControl::scaled(3, 1e-2, 10.0);
        assert_eq!(control.check(0, 5.0), SolverState::Iterate);
        assert_eq!(control.check(1, 0.09), SolverState::Success);
        assert_eq!(control.last_step(), 1);
        assert_eq!(control.initial_value(), 5.0);
        assert!(control.converged());
    }

    #[test]
    fn absolute_control_fails_at_cap() {
        let mut control = SolverControl::new(2, 1e-10);
        control.check(0, 1.0);
        control.check(1, 0.5);
        assert_eq!(control.check(2, 0.25), SolverState::Failure);
        assert!(!control.converged());
    }

    #[test]
    fn reduction_control_uses_larger_threshold() {
        let mut control = ReductionControl::new(100, 1e-20, 1e-2);
        control.check(0, 4.0);
        assert_eq!(control.check(1, 0.05), SolverState::Iterate);
        assert_eq!(control.check(2, 0.04), SolverState::Success);
    }
}
