//! Solve -u'' = 1 on (0, 1) with multigrid-preconditioned CG.
//!
//! Options are passed as `key=value` pairs, e.g.
//! `cargo run --example poisson_1d -- coarse_solver.type=cg_with_amg log_levels=true`.

use mgsolve::{
    CsrLevelOperator, CsrMatrix, MatrixTransfer, MgError, MgLevelObject, MgSolverParameters, MgVector,
    SolverControl, TextTableSink, mg_solve,
};

const MAX_LEVEL: usize = 8;

fn level_size(level: usize) -> usize {
    (1 << (level + 2)) - 1
}

fn laplacian(n: usize) -> CsrMatrix {
    let inv_h = (n + 1) as f64;
    CsrMatrix::tridiagonal(n, -inv_h, 2.0 * inv_h, -inv_h)
}

fn prolongation(n_coarse: usize) -> CsrMatrix {
    let triplets: Vec<_> = (0..n_coarse)
        .flat_map(|j| [(2 * j, j, 0.5), (2 * j + 1, j, 1.0), (2 * j + 2, j, 0.5)])
        .collect();
    CsrMatrix::from_triplets(2 * n_coarse + 1, n_coarse, &triplets)
}

fn main() -> Result<(), MgError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = args.iter().filter_map(|arg| arg.split_once('='));
    let params = MgSolverParameters::from_options(options)?;

    let operators = MgLevelObject::new(0, MAX_LEVEL, |l| CsrLevelOperator::new(laplacian(level_size(l))));
    let transfer = MatrixTransfer::new(0, (0..MAX_LEVEL).map(|l| prolongation(level_size(l))).collect())?;

    let n = level_size(MAX_LEVEL);
    let b = vec![1.0 / (n + 1) as f64; n];
    let mut x = vec![0.0; n];
    let mut control = SolverControl::scaled(100, 1e-10, b.norm());
    let mut sink = TextTableSink::new(std::io::stdout());
    let report = mg_solve(&mut control, &mut x, &b, &params, &operators, &transfer, &mut sink)?;

    // exact solution u(x) = x(1 - x)/2
    let h = 1.0 / (n + 1) as f64;
    let error = x
        .iter()
        .enumerate()
        .map(|(i, u)| {
            let t = (i + 1) as f64 * h;
            (u - 0.5 * t * (1.0 - t)).abs()
        })
        .fold(0.0, f64::max);

    println!("unknowns:           {}", n);
    println!("CG iterations:      {}", report.stats.iterations);
    println!("final residual:     {:.3e}", report.stats.final_residual);
    println!("coarse solves:      {}", report.coarse.solves);
    println!("max nodal error:    {:.3e}", error);
    Ok(())
}
