// Matrix-based level operator

use crate::core::traits::{LevelOperator, LinearOperator, MgVector};
use crate::error::MgError;
use crate::matrix::CsrMatrix;

/// Level operator backed by an assembled [`CsrMatrix`].
///
/// The matrix holds the locally owned rows; `template` fixes the vector type
/// and partitioning returned by `create_vector`.
#[derive(Debug, Clone)]
pub struct CsrLevelOperator<V> {
    matrix: CsrMatrix,
    template: V,
}

impl CsrLevelOperator<Vec<f64>> {
    /// Serial operator on plain vectors.
    pub fn new(matrix: CsrMatrix) -> Self {
        let template = vec![0.0; matrix.nrows()];
        Self { matrix, template }
    }
}

impl<V: MgVector> CsrLevelOperator<V> {
    /// Operator producing vectors shaped like `template` (e.g. a distributed vector).
    ///
    /// The matrix is applied to locally owned entries only, so coupling between
    /// processes cannot be represented; templates shared by more than one
    /// process are rejected.
    pub fn with_template(matrix: CsrMatrix, mut template: V) -> Result<Self, MgError> {
        if template.n_processes() > 1 {
            return Err(MgError::InvalidHierarchy(format!(
                "assembled level operators are process-local, template spans {} processes",
                template.n_processes()
            )));
        }
        if matrix.nrows() != matrix.ncols() || matrix.nrows() != template.local_len() {
            return Err(MgError::InvalidHierarchy(format!(
                "{}x{} matrix does not match a template with {} local entries",
                matrix.nrows(),
                matrix.ncols(),
                template.local_len()
            )));
        }
        template.set_zero();
        Ok(Self { matrix, template })
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }
}

impl<V: MgVector> LinearOperator<V> for CsrLevelOperator<V> {
    fn matvec(&self, x: &V, y: &mut V) {
        x.update_ghost_values();
        self.matrix.spmv(x.local_values(), y.local_values_mut());
    }
}

impl<V: MgVector> LevelOperator<V> for CsrLevelOperator<V> {
    fn create_vector(&self) -> V {
        self.template.clone()
    }

    fn compute_diagonal(&self) -> V {
        let mut diag = self.template.clone();
        diag.local_values_mut().copy_from_slice(&self.matrix.diagonal());
        diag
    }

    fn assembled_matrix(&self) -> Option<&CsrMatrix> {
        Some(&self.matrix)
    }
}
