//! Matrix module: sparse storage for assembled operators and transfer matrices.

pub mod sparse;
pub use sparse::CsrMatrix;
