//! 1-D Poisson hierarchies shared by the integration tests.
#![allow(dead_code)]

use mgsolve::{CsrLevelOperator, CsrMatrix, MatrixTransfer, MgLevelObject, MgSolverParameters};

/// Interior points on `level`; level 0 has 3 and every refinement doubles the cells.
pub fn level_size(level: usize) -> usize {
    (1 << (level + 2)) - 1
}

/// (1/h)·tridiag(-1, 2, -1) on `n` interior points of the unit interval.
pub fn laplacian(n: usize) -> CsrMatrix {
    let inv_h = (n + 1) as f64;
    CsrMatrix::tridiagonal(n, -inv_h, 2.0 * inv_h, -inv_h)
}

/// Linear interpolation from `n_coarse` to `2·n_coarse + 1` interior points.
pub fn prolongation(n_coarse: usize) -> CsrMatrix {
    let n_fine = 2 * n_coarse + 1;
    let mut triplets = Vec::new();
    for j in 0..n_coarse {
        triplets.push((2 * j, j, 0.5));
        triplets.push((2 * j + 1, j, 1.0));
        triplets.push((2 * j + 2, j, 0.5));
    }
    CsrMatrix::from_triplets(n_fine, n_coarse, &triplets)
}

pub fn hierarchy(min_level: usize, max_level: usize) -> (MgLevelObject<CsrLevelOperator<Vec<f64>>>, MatrixTransfer) {
    let operators = MgLevelObject::new(min_level, max_level, |l| CsrLevelOperator::new(laplacian(level_size(l))));
    let prolongations = (min_level..max_level).map(|l| prolongation(level_size(l))).collect();
    let transfer = MatrixTransfer::new(min_level, prolongations).unwrap();
    (operators, transfer)
}

/// Load vector of the constant source f = 1.
pub fn constant_rhs(n: usize) -> Vec<f64> {
    vec![1.0 / (n + 1) as f64; n]
}

pub fn params(degree: usize, smoothing_range: f64, coarse: &str) -> MgSolverParameters {
    let mut params = MgSolverParameters::default();
    params.smoother.degree = degree;
    params.smoother.smoothing_range = smoothing_range;
    params.coarse_solver.kind = coarse.to_string();
    params.coarse_solver.reltol = 1e-10;
    params
}

pub fn residual_norm(a: &CsrMatrix, x: &[f64], b: &[f64]) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.spmv(x, &mut ax);
    ax.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum::<f64>().sqrt()
}
