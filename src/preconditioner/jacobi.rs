// Jacobi preconditioner implementation

use crate::core::traits::{LevelOperator, MgVector, compute_inverse_diagonal};
use crate::error::MgError;
use crate::preconditioner::Preconditioner;

/// Jacobi preconditioner: M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct Jacobi<V> {
    pub(crate) inv_diag: V,
}

impl<V: MgVector> Jacobi<V> {
    /// Extract D⁻¹ from the operator; zero diagonal entries are left unscaled (mapped to 0).
    pub fn new<Op: LevelOperator<V> + ?Sized>(op: &Op) -> Self {
        Self { inv_diag: compute_inverse_diagonal(op) }
    }

    pub fn from_inverse_diagonal(inv_diag: V) -> Self {
        Self { inv_diag }
    }

    pub fn inverse_diagonal(&self) -> &V {
        &self.inv_diag
    }
}

impl<V: MgVector> Preconditioner<V> for Jacobi<V> {
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        z.copy_from(r);
        z.scale_pointwise(&self.inv_diag);
        Ok(())
    }
}
