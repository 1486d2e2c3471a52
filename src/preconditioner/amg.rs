// Smoothed-aggregation AMG, used to precondition the coarse-grid CG solve.
//
// The hierarchy is stored densely in faer matrices: it is only ever built
// from the (small) coarsest geometric level.

use crate::config::{AmgSettings, AmgSmootherKind};
use crate::core::traits::MgVector;
use crate::error::MgError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};

/// Levels with at most this many unknowns are factorized directly.
const DIRECT_SOLVE_SIZE: usize = 10;
const MAX_LEVELS: usize = 10;
/// Strength-of-connection threshold.
const STRENGTH_THRESHOLD: f64 = 0.08;
/// Damping of the prolongation smoother and of Jacobi relaxation.
const OMEGA: f64 = 2.0 / 3.0;

struct AmgLevel {
    matrix: Mat<f64>,
    diag_inv: Vec<f64>,
    interpolation: Mat<f64>,
    restriction: Mat<f64>,
}

pub struct AmgPreconditioner {
    levels: Vec<AmgLevel>,
    coarsest: FullPivLu<f64>,
    coarsest_size: usize,
    settings: AmgSettings,
}

impl AmgPreconditioner {
    pub fn new(a: &CsrMatrix, settings: AmgSettings) -> Result<Self, MgError> {
        if a.nrows() != a.ncols() || a.nrows() == 0 {
            return Err(MgError::InvalidHierarchy(format!(
                "AMG needs a non-empty square matrix, got {}x{}",
                a.nrows(),
                a.ncols()
            )));
        }
        let mut levels = Vec::new();
        let mut current = a.to_dense();
        while current.nrows() > DIRECT_SOLVE_SIZE && levels.len() + 1 < MAX_LEVELS {
            let strength = strength_graph(&current, STRENGTH_THRESHOLD);
            let aggregates = aggregate(&strength);
            let n_coarse = aggregates.iter().copied().max().map_or(0, |m| m + 1);
            if n_coarse == 0 || n_coarse >= current.nrows() {
                break;
            }
            let diag_inv = extract_diagonal_inverse(&current);
            let interpolation = smoothed_prolongation(&current, &diag_inv, &aggregates, n_coarse);
            let restriction = interpolation.transpose().to_owned();
            let ap = &current * &interpolation;
            let coarse = &restriction * &ap;
            log::debug!("AMG level {}: {} -> {} unknowns", levels.len(), current.nrows(), n_coarse);
            levels.push(AmgLevel { matrix: current, diag_inv, interpolation, restriction });
            current = coarse;
        }
        let coarsest_size = current.nrows();
        let coarsest = FullPivLu::new(current.as_ref());
        Ok(Self { levels, coarsest, coarsest_size, settings })
    }

    /// Number of levels, including the directly solved one.
    pub fn n_levels(&self) -> usize {
        self.levels.len() + 1
    }

    pub fn size(&self) -> usize {
        self.levels.first().map_or(self.coarsest_size, |l| l.matrix.nrows())
    }

    /// z ← M⁻¹ r with `n_cycles` V-cycles from a zero initial guess.
    pub fn apply(&self, r: &[f64], z: &mut [f64]) {
        assert_eq!(r.len(), self.size(), "AMG applied to a vector of the wrong size");
        z.iter_mut().for_each(|v| *v = 0.0);
        if self.levels.is_empty() {
            self.solve_coarsest(r, z);
            return;
        }
        let a = &self.levels[0].matrix;
        let mut residual = r.to_vec();
        let mut correction = vec![0.0; r.len()];
        for cycle in 0..self.settings.n_cycles {
            if cycle > 0 {
                mat_vec(a, z, &mut residual);
                residual.iter_mut().zip(r).for_each(|(res, &ri)| *res = ri - *res);
            }
            correction.iter_mut().for_each(|v| *v = 0.0);
            self.cycle(0, &residual, &mut correction);
            z.iter_mut().zip(&correction).for_each(|(zi, ci)| *zi += ci);
        }
    }

    fn cycle(&self, level: usize, b: &[f64], x: &mut [f64]) {
        if level == self.levels.len() {
            self.solve_coarsest(b, x);
            return;
        }
        let lvl = &self.levels[level];
        let n_coarse = lvl.interpolation.ncols();
        for _ in 0..self.settings.smoother_sweeps {
            self.relax(lvl, b, x);
        }
        let mut residual = vec![0.0; b.len()];
        mat_vec(&lvl.matrix, x, &mut residual);
        residual.iter_mut().zip(b).for_each(|(r, &bi)| *r = bi - *r);

        let mut coarse_rhs = vec![0.0; n_coarse];
        mat_vec(&lvl.restriction, &residual, &mut coarse_rhs);
        let mut coarse_x = vec![0.0; n_coarse];
        self.cycle(level + 1, &coarse_rhs, &mut coarse_x);

        let mut fine_correction = vec![0.0; b.len()];
        mat_vec(&lvl.interpolation, &coarse_x, &mut fine_correction);
        x.iter_mut().zip(&fine_correction).for_each(|(xi, ci)| *xi += ci);
        for _ in 0..self.settings.smoother_sweeps {
            self.relax(lvl, b, x);
        }
    }

    fn relax(&self, lvl: &AmgLevel, b: &[f64], x: &mut [f64]) {
        match self.settings.smoother {
            AmgSmootherKind::Jacobi => jacobi_sweep(&lvl.matrix, &lvl.diag_inv, b, x),
            AmgSmootherKind::SymmetricGaussSeidel => {
                let n = b.len();
                gauss_seidel_sweep(&lvl.matrix, &lvl.diag_inv, b, x, 0..n);
                gauss_seidel_sweep(&lvl.matrix, &lvl.diag_inv, b, x, (0..n).rev());
            }
        }
    }

    fn solve_coarsest(&self, b: &[f64], x: &mut [f64]) {
        let n = b.len();
        x.copy_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        self.coarsest.solve_in_place_with_conj(Conj::No, x_mat);
    }
}

impl<V: MgVector> Preconditioner<V> for AmgPreconditioner {
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        AmgPreconditioner::apply(self, r.local_values(), z.local_values_mut());
        Ok(())
    }
}

fn extract_diagonal_inverse(m: &Mat<f64>) -> Vec<f64> {
    (0..m.nrows())
        .map(|i| {
            let d = m[(i, i)];
            if d.abs() < 1e-14 { 0.0 } else { 1.0 / d }
        })
        .collect()
}

/// Strong neighbours of each node: |a_ij| >= θ·sqrt(|a_ii·a_jj|).
fn strength_graph(a: &Mat<f64>, threshold: f64) -> Vec<Vec<usize>> {
    let n = a.nrows();
    (0..n)
        .map(|i| {
            let a_ii = a[(i, i)].abs();
            (0..n)
                .filter(|&j| {
                    j != i && a[(i, j)] != 0.0 && a[(i, j)].abs() >= threshold * (a_ii * a[(j, j)].abs()).sqrt()
                })
                .collect()
        })
        .collect()
}

/// Greedy aggregation: each unassigned node seeds an aggregate together with
/// its unassigned strong neighbours; isolated nodes join a neighbour's aggregate.
fn aggregate(strength: &[Vec<usize>]) -> Vec<usize> {
    let n = strength.len();
    let mut aggregates = vec![usize::MAX; n];
    let mut next = 0;
    for i in 0..n {
        if aggregates[i] != usize::MAX {
            continue;
        }
        let free: Vec<usize> = strength[i].iter().copied().filter(|&j| aggregates[j] == usize::MAX).collect();
        if free.is_empty() {
            if let Some(&j) = strength[i].first() {
                aggregates[i] = aggregates[j];
                continue;
            }
        }
        aggregates[i] = next;
        for j in free {
            aggregates[j] = next;
        }
        next += 1;
    }
    aggregates
}

/// P = (I - ω D⁻¹A) P_tent with the piecewise-constant tentative prolongation.
fn smoothed_prolongation(a: &Mat<f64>, diag_inv: &[f64], aggregates: &[usize], n_coarse: usize) -> Mat<f64> {
    let n = a.nrows();
    let mut tentative = Mat::<f64>::zeros(n, n_coarse);
    for (i, &agg) in aggregates.iter().enumerate() {
        tentative[(i, agg)] = 1.0;
    }
    let ap = a * &tentative;
    let mut p = tentative;
    for i in 0..n {
        for j in 0..n_coarse {
            p[(i, j)] -= OMEGA * diag_inv[i] * ap[(i, j)];
        }
    }
    p
}

fn mat_vec(mat: &Mat<f64>, x: &[f64], y: &mut [f64]) {
    assert_eq!(mat.ncols(), x.len(), "matrix columns must match vector length");
    assert_eq!(mat.nrows(), y.len(), "matrix rows must match result length");
    let row = |i: usize| (0..mat.ncols()).map(|j| mat[(i, j)] * x[j]).sum::<f64>();
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
    }
    #[cfg(not(feature = "rayon"))]
    {
        y.iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
    }
}

fn jacobi_sweep(a: &Mat<f64>, diag_inv: &[f64], b: &[f64], x: &mut [f64]) {
    let mut ax = vec![0.0; b.len()];
    mat_vec(a, x, &mut ax);
    for i in 0..b.len() {
        x[i] += OMEGA * diag_inv[i] * (b[i] - ax[i]);
    }
}

fn gauss_seidel_sweep(a: &Mat<f64>, diag_inv: &[f64], b: &[f64], x: &mut [f64], order: impl Iterator<Item = usize>) {
    let n = b.len();
    for i in order {
        let sigma: f64 = (0..n).filter(|&j| j != i).map(|j| a[(i, j)] * x[j]).sum();
        x[i] = diag_inv[i] * (b[i] - sigma);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian(n: usize) -> CsrMatrix {
        CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0)
    }

    fn settings(smoother: AmgSmootherKind) -> AmgSettings {
        AmgSettings { smoother_sweeps: 1, n_cycles: 1, smoother }
    }

    fn residual_norm(a: &CsrMatrix, z: &[f64], r: &[f64]) -> f64 {
        let mut az = vec![0.0; r.len()];
        a.spmv(z, &mut az);
        az.iter().zip(r).map(|(x, y)| (y - x) * (y - x)).sum::<f64>().sqrt()
    }

    #[test]
    fn small_matrix_is_solved_directly() {
        let a = CsrMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 2.0)],
        );
        let amg = AmgPreconditioner::new(&a, settings(AmgSmootherKind::Jacobi)).unwrap();
        assert_eq!(amg.n_levels(), 1);
        let r = vec![5.0, 5.0, 3.0];
        let mut z = vec![0.0; 3];
        amg.apply(&r, &mut z);
        assert!(residual_norm(&a, &z, &r) < 1e-12);
    }

    fn energy_error(a: &CsrMatrix, x: &[f64], x_true: &[f64]) -> f64 {
        let e: Vec<f64> = x.iter().zip(x_true).map(|(p, q)| p - q).collect();
        let mut ae = vec![0.0; e.len()];
        a.spmv(&e, &mut ae);
        e.iter().zip(&ae).map(|(p, q)| p * q).sum::<f64>().sqrt()
    }

    /// x ← x + B(b − A x)
    fn richardson_step(amg: &AmgPreconditioner, a: &CsrMatrix, b: &[f64], x: &mut [f64]) {
        let mut r = vec![0.0; b.len()];
        a.spmv(x, &mut r);
        r.iter_mut().zip(b).for_each(|(ri, bi)| *ri = bi - *ri);
        let mut z = vec![0.0; b.len()];
        amg.apply(&r, &mut z);
        x.iter_mut().zip(&z).for_each(|(xi, zi)| *xi += zi);
    }

    #[test]
    fn builds_hierarchy_and_contracts_energy_error() {
        for n in [40, 100] {
            let a = laplacian(n);
            let x_true: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
            let mut b = vec![0.0; n];
            a.spmv(&x_true, &mut b);
            for smoother in [AmgSmootherKind::Jacobi, AmgSmootherKind::SymmetricGaussSeidel] {
                let amg = AmgPreconditioner::new(&a, settings(smoother)).unwrap();
                assert!(amg.n_levels() >= 2);
                let mut x = vec![0.0; n];
                let mut before = energy_error(&a, &x, &x_true);
                for _ in 0..3 {
                    richardson_step(&amg, &a, &b, &mut x);
                    let after = energy_error(&a, &x, &x_true);
                    assert!(after < 0.5 * before, "n={} {:?}: contraction {}", n, smoother, after / before);
                    before = after;
                }
            }
        }
    }

    #[test]
    fn aggregation_covers_every_node() {
        let a = laplacian(25).to_dense();
        let aggregates = aggregate(&strength_graph(&a, STRENGTH_THRESHOLD));
        assert!(aggregates.iter().all(|&g| g != usize::MAX));
        let n_coarse = aggregates.iter().max().unwrap() + 1;
        assert!(n_coarse < 25);
    }

    #[test]
    fn more_cycles_reduce_further() {
        let n = 30;
        let a = laplacian(n);
        let x_true: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut b = vec![0.0; n];
        a.spmv(&x_true, &mut b);
        let mut one = vec![0.0; n];
        AmgPreconditioner::new(&a, settings(AmgSmootherKind::SymmetricGaussSeidel)).unwrap().apply(&b, &mut one);
        let mut three = vec![0.0; n];
        let s = AmgSettings { n_cycles: 3, ..settings(AmgSmootherKind::SymmetricGaussSeidel) };
        AmgPreconditioner::new(&a, s).unwrap().apply(&b, &mut three);
        assert!(energy_error(&a, &three, &x_true) < energy_error(&a, &one, &x_true));
    }

    #[test]
    fn accelerates_conjugate_gradients() {
        use crate::operator::CsrLevelOperator;
        use crate::preconditioner::PreconditionIdentity;
        use crate::solver::PcgSolver;
        use crate::utils::convergence::SolverControl;

        let n = 100;
        let a = laplacian(n);
        let op = CsrLevelOperator::new(a.clone());
        let b = vec![1.0; n];
        let cg_iterations = |pc: &mut dyn Preconditioner<Vec<f64>>| {
            let mut x = vec![0.0; n];
            let mut cg = PcgSolver::new(SolverControl::new(500, 1e-8));
            let stats = cg.solve(&op, pc, &b, &mut x).unwrap();
            assert!(stats.converged);
            stats.iterations
        };
        let plain = cg_iterations(&mut PreconditionIdentity);
        let mut amg = AmgPreconditioner::new(&a, settings(AmgSmootherKind::Jacobi)).unwrap();
        let with_amg = cg_iterations(&mut amg);
        assert!(with_amg * 2 < plain, "AMG {} vs plain {}", with_amg, plain);
    }

    #[test]
    fn rejects_non_square() {
        let a = CsrMatrix::from_triplets(2, 3, &[(0, 0, 1.0)]);
        assert!(AmgPreconditioner::new(&a, settings(AmgSmootherKind::Jacobi)).is_err());
    }
}
