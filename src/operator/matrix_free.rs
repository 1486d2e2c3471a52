// Matrix-free level operator

use crate::core::traits::{LevelOperator, LinearOperator, MgVector};

/// Level operator defined by a kernel `f(src, dst)` acting on local values.
///
/// No matrix is ever assembled, so coarse strategies that need one cannot be
/// used with this operator on the coarsest level.
pub struct MatrixFreeOperator<V, F> {
    kernel: F,
    diagonal: V,
}

impl<V, F> MatrixFreeOperator<V, F>
where
    V: MgVector,
    F: Fn(&[f64], &mut [f64]),
{
    /// `diagonal` also serves as the layout template for new vectors.
    pub fn new(kernel: F, diagonal: V) -> Self {
        Self { kernel, diagonal }
    }
}

impl<V, F> LinearOperator<V> for MatrixFreeOperator<V, F>
where
    V: MgVector,
    F: Fn(&[f64], &mut [f64]),
{
    fn matvec(&self, x: &V, y: &mut V) {
        assert_eq!(y.local_len(), x.local_len(), "Input and output differ in length");
        x.update_ghost_values();
        (self.kernel)(x.local_values(), y.local_values_mut());
    }
}

impl<V, F> LevelOperator<V> for MatrixFreeOperator<V, F>
where
    V: MgVector,
    F: Fn(&[f64], &mut [f64]),
{
    fn create_vector(&self) -> V {
        let mut v = self.diagonal.clone();
        v.set_zero();
        v
    }

    fn compute_diagonal(&self) -> V {
        self.diagonal.clone()
    }
}
