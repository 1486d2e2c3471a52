//! Preconditioners and smoothers.
//!
//! This module defines the Preconditioner trait and includes the identity, Jacobi,
//! Chebyshev (smoother and coarse preconditioner) and algebraic multigrid implementations.

use crate::error::MgError;

/// A preconditioner M ≈ A⁻¹.
///
/// `apply` takes `&mut self` because several implementations keep workspace
/// or statistics (the multigrid adapter runs a full V-cycle per call).
pub trait Preconditioner<V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError>;
}

impl<V, P: Preconditioner<V> + ?Sized> Preconditioner<V> for &mut P {
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        (**self).apply(r, z)
    }
}

/// M = I.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreconditionIdentity;

impl<V: crate::core::MgVector> Preconditioner<V> for PreconditionIdentity {
    fn apply(&mut self, r: &V, z: &mut V) -> Result<(), MgError> {
        z.copy_from(r);
        Ok(())
    }
}

// Submodules for various preconditioners
pub mod jacobi;
pub mod chebyshev;
#[cfg(feature = "amg")]
pub mod amg;

// Re-exports for convenience
pub use jacobi::Jacobi;
pub use chebyshev::{ChebyshevConfig, ChebyshevPreconditioner, ChebyshevSmoother};
#[cfg(feature = "amg")]
pub use amg::AmgPreconditioner;
