//! Chebyshev polynomial smoother.
//!
//! Damps the error components of `D⁻¹A` whose eigenvalues lie in
//! `[max/smoothing_range, max]` with a Chebyshev semi-iteration of fixed
//! degree (Saad, Alg. 12.1). The resulting smoother is a polynomial in `D⁻¹A`
//! times `D⁻¹`, hence symmetric whenever `A` is, and the same instance serves
//! as pre- and post-smoother.

use crate::core::traits::{LevelOperator, MgVector, compute_inverse_diagonal};
use crate::error::MgError;
use crate::multigrid::eigen::{EigenvalueEstimate, estimate_eigenvalues};
use crate::preconditioner::Preconditioner;

/// Inflation of a bound the smoother estimated itself; Ritz values approach
/// the largest eigenvalue from below.
const ESTIMATE_SAFETY_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChebyshevConfig {
    pub degree: usize,
    pub smoothing_range: f64,
    /// CG steps for estimating the spectrum on first use; 0 disables estimation.
    pub eig_cg_n_iterations: usize,
    /// Upper end of the damped interval, if already known.
    pub max_eigenvalue: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ChebyshevSmoother<V> {
    level: usize,
    config: ChebyshevConfig,
    inverse_diagonal: V,
    estimate: Option<EigenvalueEstimate>,
}

impl<V: MgVector> ChebyshevSmoother<V> {
    pub fn new(level: usize, config: ChebyshevConfig, inverse_diagonal: V) -> Self {
        Self { level, config, inverse_diagonal, estimate: None }
    }

    /// Smoother with the operator's own inverse diagonal as inner preconditioner.
    pub fn for_operator<Op: LevelOperator<V> + ?Sized>(level: usize, op: &Op, config: ChebyshevConfig) -> Self {
        Self::new(level, config, compute_inverse_diagonal(op))
    }

    pub fn config(&self) -> &ChebyshevConfig {
        &self.config
    }

    /// Fix the upper bound and switch off estimation on first use.
    pub fn set_max_eigenvalue(&mut self, max: f64) {
        self.config.max_eigenvalue = Some(max);
        self.config.eig_cg_n_iterations = 0;
    }

    /// Estimate produced on first use, if the smoother had to compute one.
    pub fn estimate(&self) -> Option<&EigenvalueEstimate> {
        self.estimate.as_ref()
    }

    /// Run the eigenvalue estimator with this smoother's iteration count.
    pub fn estimate_eigenvalues<Op: LevelOperator<V> + ?Sized>(
        &self,
        op: &Op,
        trial: &V,
    ) -> Result<EigenvalueEstimate, MgError> {
        estimate_eigenvalues(op, &self.inverse_diagonal, self.config.eig_cg_n_iterations, trial, self.level)
    }

    /// Damped interval `[max/smoothing_range, max]`, estimating `max` first if needed.
    pub fn bounds<Op: LevelOperator<V> + ?Sized>(&mut self, op: &Op) -> Result<(f64, f64), MgError> {
        if self.config.max_eigenvalue.is_none() {
            if self.config.eig_cg_n_iterations == 0 {
                return Err(MgError::MissingEigenvalueBound { level: self.level });
            }
            let trial = op.create_vector();
            let est = self.estimate_eigenvalues(op, &trial)?;
            self.config.max_eigenvalue = Some(ESTIMATE_SAFETY_FACTOR * est.max);
            self.config.eig_cg_n_iterations = 0;
            self.estimate = Some(est);
        }
        let max = match self.config.max_eigenvalue {
            Some(max) if max.is_finite() && max > 0.0 => max,
            other => {
                return Err(MgError::InvalidEigenvalueEstimate {
                    level: self.level,
                    min: f64::NAN,
                    max: other.unwrap_or(f64::NAN),
                });
            }
        };
        Ok((max / self.config.smoothing_range, max))
    }

    /// One smoothing sweep on `A x = b` starting from the current `x`.
    pub fn smooth<Op: LevelOperator<V> + ?Sized>(&mut self, op: &Op, x: &mut V, b: &V) -> Result<(), MgError> {
        let mut r = b.clone();
        let mut ax = b.clone();
        op.matvec(x, &mut ax);
        r.add_scaled(-1.0, &ax);
        self.iterate(op, x, r)
    }

    /// z ← S·r, i.e. one sweep from a zero initial guess.
    pub fn apply<Op: LevelOperator<V> + ?Sized>(&mut self, op: &Op, r: &V, z: &mut V) -> Result<(), MgError> {
        z.set_zero();
        self.iterate(op, z, r.clone())
    }

    fn iterate<Op: LevelOperator<V> + ?Sized>(&mut self, op: &Op, x: &mut V, mut r: V) -> Result<(), MgError> {
        let (min, max) = self.bounds(op)?;
        let theta = 0.5 * (max + min);
        let delta = 0.5 * (max - min);
        let sigma = theta / delta;
        let mut rho_old = 1.0 / sigma;

        // d_0 = D⁻¹r / θ
        let mut d = r.clone();
        d.scale_pointwise(&self.inverse_diagonal);
        d.scale(1.0 / theta);
        x.add_scaled(1.0, &d);

        let mut ad = r.clone();
        let mut z = r.clone();
        for _ in 1..self.config.degree {
            op.matvec(&d, &mut ad);
            r.add_scaled(-1.0, &ad);
            let rho = 1.0 / (2.0 * sigma - rho_old);
            z.copy_from(&r);
            z.scale_pointwise(&self.inverse_diagonal);
            d.sadd(rho * rho_old, 2.0 * rho / delta, &z);
            x.add_scaled(1.0, &d);
            rho_old = rho;
        }
        Ok(())
    }
}

/// A Chebyshev smoother bound to its operator, usable as a preconditioner.
pub struct ChebyshevPreconditioner<'a, V, Op: ?Sized> {
    pub op: &'a Op,
    pub smoother: &'a mut ChebyshevSmoother<V>,
}

impl<V: MgVector, Op: LevelOperator<V> + ?Sized> Preconditioner<V> for ChebyshevPreconditioner<'_, V, Op> {
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        self.smoother.apply(self.op, r, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LinearOperator;
    use crate::matrix::CsrMatrix;
    use crate::operator::CsrLevelOperator;

    fn energy_error(op: &CsrLevelOperator<Vec<f64>>, x: &[f64], x_true: &[f64]) -> f64 {
        let e: Vec<f64> = x.iter().zip(x_true).map(|(a, b)| a - b).collect();
        let mut ae = vec![0.0; e.len()];
        op.matvec(&e, &mut ae);
        e.dot(&ae).sqrt()
    }

    #[test]
    fn smoothing_reduces_energy_error() {
        let n = 15;
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0));
        // exact largest eigenvalue of D⁻¹A
        let max = 1.0 + (std::f64::consts::PI / (n as f64 + 1.0)).cos();
        let config = ChebyshevConfig { degree: 3, smoothing_range: 10.0, eig_cg_n_iterations: 0, max_eigenvalue: Some(max) };
        let mut smoother = ChebyshevSmoother::for_operator(1, &op, config);

        let x_true: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let mut b = vec![0.0; n];
        op.matvec(&x_true, &mut b);

        let mut x = vec![0.0; n];
        let mut before = energy_error(&op, &x, &x_true);
        for _ in 0..2 {
            smoother.smooth(&op, &mut x, &b).unwrap();
            let after = energy_error(&op, &x, &x_true);
            assert!(after < before, "energy error grew: {} -> {}", before, after);
            before = after;
        }
    }

    #[test]
    fn apply_matches_smooth_from_zero() {
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(6, -1.0, 2.0, -1.0));
        let config = ChebyshevConfig { degree: 4, smoothing_range: 20.0, eig_cg_n_iterations: 0, max_eigenvalue: Some(2.0) };
        let mut smoother = ChebyshevSmoother::for_operator(1, &op, config);
        let b = vec![1.0, -1.0, 2.0, 0.5, 0.0, 3.0];
        let mut x1 = vec![0.0; 6];
        smoother.smooth(&op, &mut x1, &b).unwrap();
        let mut x2 = vec![7.0; 6];
        smoother.apply(&op, &b, &mut x2).unwrap();
        for (a, c) in x1.iter().zip(&x2) {
            assert!((a - c).abs() < 1e-12);
        }
    }

    #[test]
    fn estimates_on_first_use() {
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(20, -1.0, 2.0, -1.0));
        let config = ChebyshevConfig { degree: 2, smoothing_range: 15.0, eig_cg_n_iterations: 10, max_eigenvalue: None };
        let mut smoother = ChebyshevSmoother::for_operator(2, &op, config);
        assert!(smoother.estimate().is_none());
        let mut x = vec![0.0; 20];
        smoother.smooth(&op, &mut x, &vec![1.0; 20]).unwrap();
        let est = *smoother.estimate().unwrap();
        assert_eq!(smoother.config().max_eigenvalue, Some(ESTIMATE_SAFETY_FACTOR * est.max));
        assert_eq!(smoother.config().eig_cg_n_iterations, 0);
    }

    #[test]
    fn missing_bound_is_reported() {
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(4, -1.0, 2.0, -1.0));
        let config = ChebyshevConfig { degree: 2, smoothing_range: 15.0, eig_cg_n_iterations: 0, max_eigenvalue: None };
        let mut smoother = ChebyshevSmoother::for_operator(3, &op, config);
        let mut x = vec![0.0; 4];
        let err = smoother.smooth(&op, &mut x, &vec![1.0; 4]).unwrap_err();
        assert!(matches!(err, MgError::MissingEigenvalueBound { level: 3 }));
    }
}
