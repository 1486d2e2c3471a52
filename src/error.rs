use thiserror::Error;

// Unified error type for mgsolve

#[derive(Error, Debug)]
pub enum MgError {
    #[error("unsupported smoother type '{0}' (only \"chebyshev\" is available)")]
    UnsupportedSmoother(String),
    #[error("unsupported coarse-grid solver type '{0}'")]
    UnsupportedCoarseSolver(String),
    #[error("unsupported AMG smoother type '{0}'")]
    UnsupportedAmgSmoother(String),
    #[error("algebraic multigrid coarse solver requested, but the crate was built without the `amg` feature")]
    AmgUnavailable,
    #[error("coarse-grid strategy needs an assembled matrix, but the operator on level {level} does not provide one")]
    AssembledMatrixRequired { level: usize },
    #[error("invalid value '{value}' for option '{key}': {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("invalid level hierarchy: {0}")]
    InvalidHierarchy(String),
    #[error("invalid eigenvalue estimate on level {level}: min = {min}, max = {max}")]
    InvalidEigenvalueEstimate { level: usize, min: f64, max: f64 },
    #[error("no eigenvalue bound available for the Chebyshev smoother on level {level}")]
    MissingEigenvalueBound { level: usize },
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
    #[error("indefinite preconditioner detected (beta < 0)")]
    IndefinitePreconditioner,
    #[error("i/o error while writing diagnostics: {0}")]
    Io(#[from] std::io::Error),
}

impl MgError {
    /// Errors that are detected before the first cycle and must abort the solve.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MgError::UnsupportedSmoother(_)
                | MgError::UnsupportedCoarseSolver(_)
                | MgError::UnsupportedAmgSmoother(_)
                | MgError::AmgUnavailable
                | MgError::AssembledMatrixRequired { .. }
                | MgError::InvalidOption { .. }
                | MgError::UnknownOption(_)
                | MgError::InvalidHierarchy(_)
        )
    }

    pub(crate) fn invalid_option(key: &str, value: impl ToString, reason: &str) -> Self {
        MgError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
