//! Eigenvalue estimation for the Chebyshev smoother.
//!
//! A few steps of Jacobi-preconditioned CG are run on `A x = v` for a
//! pseudo-random `v`. The CG coefficients define the Lanczos tridiagonal
//! matrix of the preconditioned operator `D⁻¹A`, whose extremal eigenvalues
//! (found by Sturm bisection) bound the spectrum the smoother has to damp.

use crate::core::traits::{LevelOperator, MgVector};
use crate::error::MgError;
use crate::preconditioner::Jacobi;
use crate::solver::{CgCoefficients, PcgSolver};
use crate::utils::convergence::ReductionControl;

/// Relative residual at which the estimation CG may stop early.
const EIG_CG_RESIDUAL: f64 = 1e-2;

/// Extremal eigenvalue estimates of one level's preconditioned operator.
#[derive(Clone, Copy, Debug)]
pub struct EigenvalueEstimate {
    pub min: f64,
    pub max: f64,
    /// CG steps that produced the estimate.
    pub cg_iterations: usize,
}

impl EigenvalueEstimate {
    /// Placeholder for levels that were not estimated.
    pub const UNSET: Self = Self { min: f64::NAN, max: f64::NAN, cg_iterations: 0 };

    pub fn is_set(&self) -> bool {
        !self.min.is_nan() && !self.max.is_nan()
    }

    /// Reject NaN and non-positive bounds.
    pub fn validate(self, level: usize) -> Result<Self, MgError> {
        let ok = self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.max >= self.min;
        if ok {
            Ok(self)
        } else {
            Err(MgError::InvalidEigenvalueEstimate { level, min: self.min, max: self.max })
        }
    }
}

/// Unset estimates compare equal to each other, so per-level tables with an
/// unestimated coarsest level can be compared.
impl PartialEq for EigenvalueEstimate {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_set(), other.is_set()) {
            (false, false) => true,
            (true, true) => self.min == other.min && self.max == other.max && self.cg_iterations == other.cg_iterations,
            _ => false,
        }
    }
}

impl Default for EigenvalueEstimate {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Deterministic, globally mean-free start vector shaped like `template`.
///
/// Entries are seeded from global indices, so the vector does not depend on
/// how it is partitioned. A vector with a single global entry keeps its value,
/// since removing the mean would leave nothing to iterate on.
pub fn trial_vector<V: MgVector>(template: &V) -> V {
    let mut v = template.clone();
    let offset = template.global_offset();
    for (i, vi) in v.local_values_mut().iter_mut().enumerate() {
        let hash = ((offset + i) as u64).wrapping_mul(2_654_435_761).wrapping_add(12_345) % 1_000;
        *vi = 1.0 + hash as f64 / 1_000.0;
    }
    let mut ones = template.clone();
    ones.local_values_mut().iter_mut().for_each(|x| *x = 1.0);
    let n = ones.dot(&ones);
    if n > 1.0 {
        let mean = ones.dot(&v) / n;
        v.add_scaled(-mean, &ones);
    }
    v
}

/// Estimate the extremal eigenvalues of `D⁻¹A` with `n_iterations` CG steps.
///
/// `trial` is only read; the iteration works on copies.
pub fn estimate_eigenvalues<V, Op>(
    op: &Op,
    inverse_diagonal: &V,
    n_iterations: usize,
    trial: &V,
    level: usize,
) -> Result<EigenvalueEstimate, MgError>
where
    V: MgVector,
    Op: LevelOperator<V> + ?Sized,
{
    let rhs = trial_vector(trial);
    let mut x = rhs.clone();
    x.set_zero();
    let mut pc = Jacobi::from_inverse_diagonal(inverse_diagonal.clone());
    let mut cg = PcgSolver::new(ReductionControl::new(n_iterations, 0.0, EIG_CG_RESIDUAL))
        .with_coefficient_recording(true);
    cg.solve(op, &mut pc, &rhs, &mut x)?;

    let estimate = match lanczos_extremal_eigenvalues(cg.coefficients()) {
        Some((min, max)) => EigenvalueEstimate { min, max, cg_iterations: cg.coefficients().alphas.len() },
        None => EigenvalueEstimate::UNSET,
    };
    log::debug!(
        "level {}: eigenvalue estimate [{:e}, {:e}] from {} CG steps",
        level, estimate.min, estimate.max, estimate.cg_iterations
    );
    estimate.validate(level)
}

/// Rebuild the Lanczos tridiagonal matrix from CG coefficients and return its
/// smallest and largest eigenvalue.
pub fn lanczos_extremal_eigenvalues(coeffs: &CgCoefficients) -> Option<(f64, f64)> {
    let m = coeffs.alphas.len();
    if m == 0 {
        return None;
    }
    let mut diag = Vec::with_capacity(m);
    let mut off = Vec::with_capacity(m.saturating_sub(1));
    for k in 0..m {
        let mut d = 1.0 / coeffs.alphas[k];
        if k > 0 {
            d += coeffs.betas[k - 1] / coeffs.alphas[k - 1];
        }
        diag.push(d);
        if k + 1 < m {
            off.push(coeffs.betas[k].sqrt() / coeffs.alphas[k]);
        }
    }
    tridiagonal_extremal_eigenvalues(&diag, &off)
}

/// Number of eigenvalues of the symmetric tridiagonal matrix strictly below `x`.
fn sturm_count(diag: &[f64], off: &[f64], x: f64) -> usize {
    let mut count = 0;
    let mut q = 1.0;
    for i in 0..diag.len() {
        let coupling = if i > 0 { off[i - 1] * off[i - 1] / q } else { 0.0 };
        q = diag[i] - x - coupling;
        if q == 0.0 {
            q = -f64::EPSILON * (diag[i].abs() + x.abs()).max(f64::MIN_POSITIVE);
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// Extremal eigenvalues of a symmetric tridiagonal matrix by bisection.
pub fn tridiagonal_extremal_eigenvalues(diag: &[f64], off: &[f64]) -> Option<(f64, f64)> {
    let n = diag.len();
    if n == 0 || off.len() + 1 != n || diag.iter().chain(off).any(|v| !v.is_finite()) {
        return None;
    }
    // Gershgorin interval
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..n {
        let radius = if i > 0 { off[i - 1].abs() } else { 0.0 } + if i + 1 < n { off[i].abs() } else { 0.0 };
        lo = lo.min(diag[i] - radius);
        hi = hi.max(diag[i] + radius);
    }
    let kth = |k: usize| {
        let (mut a, mut b) = (lo, hi);
        for _ in 0..200 {
            let mid = 0.5 * (a + b);
            if sturm_count(diag, off, mid) > k {
                b = mid;
            } else {
                a = mid;
            }
            if b - a <= 4.0 * f64::EPSILON * a.abs().max(b.abs()).max(f64::MIN_POSITIVE) {
                break;
            }
        }
        0.5 * (a + b)
    };
    Some((kth(0), kth(n - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use crate::operator::CsrLevelOperator;
    use crate::core::compute_inverse_diagonal;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bisection_on_known_tridiagonal() {
        // tridiag(-1, 2, -1) of size n has eigenvalues 2 - 2cos(kπ/(n+1))
        let n = 8;
        let (min, max) = tridiagonal_extremal_eigenvalues(&vec![2.0; n], &vec![-1.0; n - 1]).unwrap();
        let h = std::f64::consts::PI / (n as f64 + 1.0);
        assert_abs_diff_eq!(min, 2.0 - 2.0 * h.cos(), epsilon = 1e-10);
        assert_abs_diff_eq!(max, 2.0 + 2.0 * h.cos(), epsilon = 1e-10);
    }

    #[test]
    fn single_entry_tridiagonal() {
        let (min, max) = tridiagonal_extremal_eigenvalues(&[3.0], &[]).unwrap();
        assert_abs_diff_eq!(min, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(max, 3.0, epsilon = 1e-12);
        assert!(tridiagonal_extremal_eigenvalues(&[], &[]).is_none());
    }

    #[test]
    fn trial_vector_is_mean_free() {
        let v = trial_vector(&vec![0.0; 17]);
        let sum: f64 = v.iter().sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-12);
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn estimates_bound_jacobi_scaled_laplacian() {
        // D⁻¹A for tridiag(-1,2,-1) has spectrum 1 - cos(kπ/(n+1)) ⊂ (0, 2)
        let n = 31;
        let op = CsrLevelOperator::new(CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0));
        let inv_diag = compute_inverse_diagonal(&op);
        let trial = vec![0.0; n];
        let est = estimate_eigenvalues(&op, &inv_diag, 20, &trial, 1).unwrap();
        let exact_max = 1.0 + (std::f64::consts::PI / (n as f64 + 1.0)).cos();
        assert!(est.min > 0.0);
        assert!(est.max <= exact_max + 1e-8, "max estimate {} above spectrum", est.max);
        assert!(est.max > 1.5, "max estimate {} too small", est.max);
        assert!(est.cg_iterations <= 20);
        assert!(trial.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn single_unknown_is_estimated() {
        let op = CsrLevelOperator::new(CsrMatrix::from_triplets(1, 1, &[(0, 0, 5.0)]));
        let inv_diag = compute_inverse_diagonal(&op);
        let trial = trial_vector(&vec![0.0; 1]);
        assert!(trial[0] != 0.0);
        let est = estimate_eigenvalues(&op, &inv_diag, 10, &vec![0.0; 1], 0).unwrap();
        assert_abs_diff_eq!(est.min, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(est.max, 1.0, epsilon = 1e-12);
        assert_eq!(est.cg_iterations, 1);
    }

    #[test]
    fn trial_vector_follows_global_indices() {
        use crate::core::wrappers::DistributedVector;
        use crate::parallel::Comm;
        use std::sync::Arc;

        // second half of a 10-entry vector owned by another process
        struct UpperHalf;
        impl Comm for UpperHalf {
            fn rank(&self) -> usize { 1 }
            fn size(&self) -> usize { 2 }
            fn barrier(&self) {}
            fn all_reduce(&self, x: f64) -> f64 { x }
            fn scan_sum(&self, x: f64) -> f64 { x + 5.0 }
        }
        let part = trial_vector(&DistributedVector::new(Arc::new(UpperHalf), 5));
        let mut whole = vec![0.0; 10];
        for (i, w) in whole.iter_mut().enumerate() {
            let hash = (i as u64).wrapping_mul(2_654_435_761).wrapping_add(12_345) % 1_000;
            *w = 1.0 + hash as f64 / 1_000.0;
        }
        // the local reduction only sees this half, so compare up to the shift
        let shift = part.local_values()[0] - whole[5];
        for (p, w) in part.local_values().iter().zip(&whole[5..]) {
            assert_abs_diff_eq!(p - w, shift, epsilon = 1e-12);
        }
    }

    #[test]
    fn unset_estimates_compare_equal() {
        assert_eq!(EigenvalueEstimate::UNSET, EigenvalueEstimate::default());
        let set = EigenvalueEstimate { min: 0.1, max: 1.9, cg_iterations: 4 };
        assert_eq!(set, set);
        assert_ne!(set, EigenvalueEstimate::UNSET);
    }

    #[test]
    fn invalid_estimates_are_rejected() {
        let est = EigenvalueEstimate { min: -1.0, max: 2.0, cg_iterations: 3 };
        assert!(matches!(est.validate(2), Err(MgError::InvalidEigenvalueEstimate { level: 2, .. })));
        assert!(EigenvalueEstimate::UNSET.validate(1).is_err());
        assert!(!EigenvalueEstimate::default().is_set());
    }
}
