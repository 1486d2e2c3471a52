use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mgsolve::{
    ChebyshevConfig, ChebyshevSmoother, CsrLevelOperator, CsrMatrix, MatrixTransfer, MgCoarseGridSolver,
    MgLevelObject, MgSolverParameters, Multigrid,
};

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

fn bench_vcycle(c: &mut Criterion) {
    let settings = MgSolverParameters::default().resolve().unwrap();
    let mut group = c.benchmark_group("v-cycle");
    for max_level in [6, 9, 12] {
        let operators = MgLevelObject::new(0, max_level, |l| CsrLevelOperator::new(laplacian(level_size(l))));
        let transfer = MatrixTransfer::new(0, (0..max_level).map(|l| prolongation(level_size(l))).collect()).unwrap();
        let config = ChebyshevConfig {
            degree: settings.smoother.degree,
            smoothing_range: settings.smoother.smoothing_range,
            eig_cg_n_iterations: 0,
            max_eigenvalue: Some(2.2),
        };
        let smoothers = (1..=max_level)
            .map(|l| ChebyshevSmoother::for_operator(l, &operators[l], config))
            .collect();
        let coarse = MgCoarseGridSolver::new(0, &operators[0], &settings.coarse, &settings.smoother).unwrap();
        let mut mg = Multigrid::new(&operators, &transfer, smoothers, coarse, None);

        let n = level_size(max_level);
        let b: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let mut x = vec![0.0; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &b, |ben, b| {
            ben.iter(|| mg.apply(black_box(b), black_box(&mut x)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_vcycle);
criterion_main!(benches);
