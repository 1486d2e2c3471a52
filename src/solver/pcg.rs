//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! Used both as the outer solver (preconditioned by one V-cycle) and on the
//! coarsest level. The solver can record its step lengths so that the
//! Lanczos tridiagonal matrix of the preconditioned operator can be rebuilt
//! afterwards; the eigenvalue estimator relies on that.

use crate::core::traits::{LinearOperator, MgVector};
use crate::error::MgError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::{SolveStats, SolverState, StoppingCriterion};

/// CG step lengths alpha_k and direction updates beta_k, in iteration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgCoefficients {
    pub alphas: Vec<f64>,
    pub betas: Vec<f64>,
}

pub struct PcgSolver<C> {
    pub control: C,
    record_coefficients: bool,
    coefficients: CgCoefficients,
    pub monitor: Option<Box<dyn FnMut(usize, f64)>>,
    pub residual_history: Vec<f64>,
}

impl<C: StoppingCriterion> PcgSolver<C> {
    pub fn new(control: C) -> Self {
        Self {
            control,
            record_coefficients: false,
            coefficients: CgCoefficients::default(),
            monitor: None,
            residual_history: Vec::new(),
        }
    }
    pub fn with_coefficient_recording(mut self, flag: bool) -> Self {
        self.record_coefficients = flag;
        self
    }
    pub fn with_monitor<F>(mut self, f: F) -> Self
    where F: FnMut(usize, f64) + 'static {
        self.monitor = Some(Box::new(f));
        self
    }
    pub fn coefficients(&self) -> &CgCoefficients {
        &self.coefficients
    }
    pub fn into_control(self) -> C {
        self.control
    }

    fn observe(&mut self, step: usize, res_norm: f64) -> SolverState {
        if let Some(ref mut monitor) = self.monitor {
            monitor(step, res_norm);
        }
        self.residual_history.push(res_norm);
        self.control.check(step, res_norm)
    }

    fn stats(&self, state: SolverState) -> SolveStats {
        SolveStats {
            iterations: self.control.last_step(),
            final_residual: self.control.last_value(),
            converged: state == SolverState::Success,
        }
    }

    /// Solve A·x = b with x as initial guess. Non-convergence is reported in the
    /// returned stats; breakdowns are errors.
    pub fn solve<V, A, P>(&mut self, a: &A, pc: &mut P, b: &V, x: &mut V) -> Result<SolveStats, MgError>
    where
        V: MgVector,
        A: LinearOperator<V> + ?Sized,
        P: Preconditioner<V> + ?Sized,
    {
        self.coefficients = CgCoefficients::default();
        self.residual_history.clear();

        let mut ap = b.clone();
        a.matvec(x, &mut ap);
        let mut r = b.clone();
        r.add_scaled(-1.0, &ap);

        let mut state = self.observe(0, r.norm());
        if state != SolverState::Iterate {
            return Ok(self.stats(state));
        }

        let mut z = b.clone();
        pc.apply(&r, &mut z)?;
        let mut p = z.clone();
        let mut rz = r.dot(&z);

        let mut step = 0;
        while state == SolverState::Iterate {
            step += 1;
            a.matvec(&p, &mut ap);
            let p_dot_ap = p.dot(&ap);
            // Indefinite-matrix detection
            if p_dot_ap <= 0.0 {
                return Err(MgError::IndefiniteMatrix);
            }
            let alpha = rz / p_dot_ap;
            if self.record_coefficients {
                self.coefficients.alphas.push(alpha);
            }
            x.add_scaled(alpha, &p);
            r.add_scaled(-alpha, &ap);

            state = self.observe(step, r.norm());
            if state != SolverState::Iterate {
                break;
            }

            pc.apply(&r, &mut z)?;
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            // Indefinite-preconditioner detection
            if beta < 0.0 {
                return Err(MgError::IndefinitePreconditioner);
            }
            if self.record_coefficients {
                self.coefficients.betas.push(beta);
            }
            p.sadd(beta, 1.0, &z);
            rz = rz_new;
        }
        Ok(self.stats(state))
    }
}
