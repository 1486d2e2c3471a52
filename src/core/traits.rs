//! Core linear-algebra traits for mgsolve.
//!
//! The multigrid core never looks inside a vector or an operator. Vectors are
//! reached through [`MgVector`], whose reductions are collective across all
//! processes, and level operators through [`LevelOperator`].

use crate::matrix::CsrMatrix;

/// A vector partitioned across processes.
///
/// `local_values` exposes the locally owned range; `dot` and `norm` reduce over
/// every process and must be called by all of them in the same order.
pub trait MgVector: Clone {
    /// Locally owned entries.
    fn local_values(&self) -> &[f64];
    /// Locally owned entries, mutable.
    fn local_values_mut(&mut self) -> &mut [f64];
    /// Global inner product (collective).
    fn dot(&self, other: &Self) -> f64;

    /// Global Euclidean norm (collective).
    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Refresh ghost entries from their owners. No-op for unpartitioned vectors.
    fn update_ghost_values(&self) {}

    /// Rank of the calling process in the vector's communicator.
    fn process_rank(&self) -> usize {
        0
    }

    /// Number of processes sharing the vector.
    fn n_processes(&self) -> usize {
        1
    }

    /// Global index of the first locally owned entry.
    fn global_offset(&self) -> usize {
        0
    }

    fn local_len(&self) -> usize {
        self.local_values().len()
    }

    fn set_zero(&mut self) {
        self.local_values_mut().iter_mut().for_each(|v| *v = 0.0);
    }

    /// self ← other
    fn copy_from(&mut self, other: &Self) {
        self.local_values_mut().copy_from_slice(other.local_values());
    }

    /// self ← self + a·x
    fn add_scaled(&mut self, a: f64, x: &Self) {
        let x = x.local_values();
        let y = self.local_values_mut();
        assert_eq!(x.len(), y.len(), "vector lengths differ");
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += a * xi;
        }
    }

    /// self ← s·self + a·x
    fn sadd(&mut self, s: f64, a: f64, x: &Self) {
        let x = x.local_values();
        let y = self.local_values_mut();
        assert_eq!(x.len(), y.len(), "vector lengths differ");
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi = s * *yi + a * xi;
        }
    }

    /// self ← a·self
    fn scale(&mut self, a: f64) {
        self.local_values_mut().iter_mut().for_each(|v| *v *= a);
    }

    /// self ← self ∘ d (entrywise product)
    fn scale_pointwise(&mut self, d: &Self) {
        let d = d.local_values();
        let y = self.local_values_mut();
        assert_eq!(d.len(), y.len(), "vector lengths differ");
        for (yi, di) in y.iter_mut().zip(d) {
            *yi *= di;
        }
    }
}

/// Matrix–vector product: y ← A x.
pub trait LinearOperator<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Contract every per-level system matrix satisfies.
pub trait LevelOperator<V>: LinearOperator<V> {
    /// A zero vector sized and partitioned for this level.
    fn create_vector(&self) -> V;

    /// Diagonal of the operator, in the layout of [`LevelOperator::create_vector`].
    fn compute_diagonal(&self) -> V;

    /// Assembled sparse matrix, when the operator has one.
    fn assembled_matrix(&self) -> Option<&CsrMatrix> {
        None
    }
}

impl<V, T: LinearOperator<V> + ?Sized> LinearOperator<V> for &T {
    fn matvec(&self, x: &V, y: &mut V) {
        (**self).matvec(x, y)
    }
}

impl<V, T: LevelOperator<V> + ?Sized> LevelOperator<V> for &T {
    fn create_vector(&self) -> V {
        (**self).create_vector()
    }
    fn compute_diagonal(&self) -> V {
        (**self).compute_diagonal()
    }
    fn assembled_matrix(&self) -> Option<&CsrMatrix> {
        (**self).assembled_matrix()
    }
}

impl<V, T: LinearOperator<V> + ?Sized> LinearOperator<V> for Box<T> {
    fn matvec(&self, x: &V, y: &mut V) {
        (**self).matvec(x, y)
    }
}

impl<V, T: LevelOperator<V> + ?Sized> LevelOperator<V> for Box<T> {
    fn create_vector(&self) -> V {
        (**self).create_vector()
    }
    fn compute_diagonal(&self) -> V {
        (**self).compute_diagonal()
    }
    fn assembled_matrix(&self) -> Option<&CsrMatrix> {
        (**self).assembled_matrix()
    }
}

/// Inverse of the operator diagonal; zero entries map to zero.
pub fn compute_inverse_diagonal<V: MgVector, Op: LevelOperator<V> + ?Sized>(op: &Op) -> V {
    let mut diag = op.compute_diagonal();
    diag.local_values_mut()
        .iter_mut()
        .for_each(|d| *d = if *d != 0.0 { 1.0 / *d } else { 0.0 });
    diag
}
