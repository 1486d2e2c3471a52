//! Vector and dense-matrix wrappers.
//!
//! This module implements [`MgVector`] for plain `Vec<f64>` (a single process
//! owning every entry) and for [`DistributedVector`], which reduces inner
//! products across processes through a [`Comm`]. It also lets small dense
//! `faer::Mat<f64>` matrices act as level operators.
//!
//! With the `rayon` feature the local reductions use parallel iterators.

use crate::core::traits::{LevelOperator, LinearOperator, MgVector};
use crate::parallel::Comm;
use faer::Mat;
use std::sync::Arc;

fn local_dot(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter().zip(y.par_iter()).map(|(xi, yi)| xi * yi).sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().zip(y).map(|(xi, yi)| xi * yi).sum()
    }
}

impl MgVector for Vec<f64> {
    fn local_values(&self) -> &[f64] {
        self
    }
    fn local_values_mut(&mut self) -> &mut [f64] {
        self
    }
    fn dot(&self, other: &Self) -> f64 {
        local_dot(self, other)
    }
}

/// Locally owned part of a vector partitioned over the processes of `comm`.
///
/// Ranks own contiguous blocks in rank order. There is no ghost range: the
/// vector only supports operators whose local action needs nothing beyond the
/// owned entries, see [`CsrLevelOperator::with_template`](crate::operator::CsrLevelOperator::with_template).
/// Construction is collective.
pub struct DistributedVector<C: Comm> {
    values: Vec<f64>,
    offset: usize,
    comm: Arc<C>,
}

impl<C: Comm> DistributedVector<C> {
    pub fn new(comm: Arc<C>, local_len: usize) -> Self {
        Self::from_local(comm, vec![0.0; local_len])
    }

    pub fn from_local(comm: Arc<C>, values: Vec<f64>) -> Self {
        let local = values.len() as f64;
        let offset = (comm.scan_sum(local) - local).round() as usize;
        Self { values, offset, comm }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn into_local(self) -> Vec<f64> {
        self.values
    }
}

impl<C: Comm> Clone for DistributedVector<C> {
    fn clone(&self) -> Self {
        Self { values: self.values.clone(), offset: self.offset, comm: Arc::clone(&self.comm) }
    }
}

impl<C: Comm> std::fmt::Debug for DistributedVector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedVector")
            .field("rank", &self.comm.rank())
            .field("values", &self.values)
            .finish()
    }
}

impl<C: Comm> MgVector for DistributedVector<C> {
    fn local_values(&self) -> &[f64] {
        &self.values
    }
    fn local_values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
    fn dot(&self, other: &Self) -> f64 {
        self.comm.all_reduce(local_dot(&self.values, &other.values))
    }
    fn process_rank(&self) -> usize {
        self.comm.rank()
    }
    fn n_processes(&self) -> usize {
        self.comm.size()
    }
    fn global_offset(&self) -> usize {
        self.offset
    }
}

/// Dense matrix-vector product y = A·x.
impl LinearOperator<Vec<f64>> for Mat<f64> {
    fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = (0..self.ncols()).map(|j| self[(i, j)] * x[j]).sum();
        }
    }
}

impl LevelOperator<Vec<f64>> for Mat<f64> {
    fn create_vector(&self) -> Vec<f64> {
        vec![0.0; self.nrows()]
    }
    fn compute_diagonal(&self) -> Vec<f64> {
        (0..self.nrows()).map(|i| self[(i, i)]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialComm;
    use approx::assert_abs_diff_eq;

    #[test]
    fn vec_kernels() {
        let mut y = vec![1.0, 2.0, 3.0];
        let x = vec![1.0, 1.0, 1.0];
        y.sadd(2.0, -1.0, &x);
        assert_eq!(y, vec![1.0, 3.0, 5.0]);
        y.scale_pointwise(&vec![2.0, 0.5, 0.0]);
        assert_eq!(y, vec![2.0, 1.5, 0.0]);
        assert_abs_diff_eq!(y.norm(), (4.0f64 + 2.25).sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn distributed_vector_reduces_through_comm() {
        let comm = Arc::new(SerialComm);
        let a = DistributedVector::from_local(comm.clone(), vec![1.0, 2.0]);
        let mut b = DistributedVector::new(comm, 2);
        b.copy_from(&a);
        b.add_scaled(1.0, &a);
        assert_abs_diff_eq!(a.dot(&b), 10.0, epsilon = 1e-14);
        assert_eq!(b.process_rank(), 0);
        assert_eq!(b.global_offset(), 0);
        assert_eq!(b.n_processes(), 1);
    }

    #[test]
    fn dense_level_operator() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { -1.0 });
        let mut y = a.create_vector();
        a.matvec(&vec![1.0, 1.0], &mut y);
        assert_eq!(y, vec![1.0, 1.0]);
        assert_eq!(a.compute_diagonal(), vec![2.0, 2.0]);
    }
}
