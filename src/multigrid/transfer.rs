//! Transfer of vectors between neighbouring levels.
//!
//! Level `l` owns the operators that move data between `l - 1` and `l`.
//! The V-cycle only needs the `*_and_add` forms; the destination is zeroed by
//! the caller when a plain transfer is wanted.

use crate::core::traits::MgVector;
use crate::error::MgError;
use crate::matrix::CsrMatrix;

pub trait MgTransfer<V> {
    /// dst (level - 1) += R_level · src (level).
    fn restrict_and_add(&self, level: usize, dst: &mut V, src: &V);

    /// dst (level) += P_level · src (level - 1).
    fn prolongate_and_add(&self, level: usize, dst: &mut V, src: &V);

    /// Whether level `level` has dofs outside the refinement of level - 1.
    fn has_edge_dofs(&self, _level: usize) -> bool {
        false
    }

    /// dst (level) += E_level · src (level - 1), the edge-dof part of prolongation.
    fn edge_prolongate_and_add(&self, _level: usize, _dst: &mut V, _src: &V) {}

    /// Levels this transfer was built for, if it knows them.
    fn level_range(&self) -> Option<(usize, usize)> {
        None
    }
}

impl<V, T: MgTransfer<V> + ?Sized> MgTransfer<V> for &T {
    fn restrict_and_add(&self, level: usize, dst: &mut V, src: &V) {
        (**self).restrict_and_add(level, dst, src)
    }
    fn prolongate_and_add(&self, level: usize, dst: &mut V, src: &V) {
        (**self).prolongate_and_add(level, dst, src)
    }
    fn has_edge_dofs(&self, level: usize) -> bool {
        (**self).has_edge_dofs(level)
    }
    fn edge_prolongate_and_add(&self, level: usize, dst: &mut V, src: &V) {
        (**self).edge_prolongate_and_add(level, dst, src)
    }
    fn level_range(&self) -> Option<(usize, usize)> {
        (**self).level_range()
    }
}

#[derive(Clone, Debug)]
struct LevelTransfer {
    prolongation: CsrMatrix,
    edge: Option<CsrMatrix>,
    restriction: CsrMatrix,
}

/// Transfer given by explicit per-level matrices.
///
/// Each level carries its prolongation `P` (fine × coarse) and, optionally, an
/// edge prolongation `E` of the same shape. Restriction applies `(P + E)ᵀ`, so
/// it is the exact adjoint of the full prolongation.
#[derive(Clone, Debug)]
pub struct MatrixTransfer {
    min_level: usize,
    levels: Vec<LevelTransfer>,
}

impl MatrixTransfer {
    /// `prolongations[i]` maps level `min_level + i` to `min_level + i + 1`.
    pub fn new(min_level: usize, prolongations: Vec<CsrMatrix>) -> Result<Self, MgError> {
        let edges = vec![None; prolongations.len()];
        Self::with_edges(min_level, prolongations, edges)
    }

    pub fn with_edges(
        min_level: usize,
        prolongations: Vec<CsrMatrix>,
        edges: Vec<Option<CsrMatrix>>,
    ) -> Result<Self, MgError> {
        if prolongations.len() != edges.len() {
            return Err(MgError::InvalidHierarchy(format!(
                "{} prolongations but {} edge prolongations",
                prolongations.len(),
                edges.len()
            )));
        }
        for (i, pair) in prolongations.windows(2).enumerate() {
            if pair[0].nrows() != pair[1].ncols() {
                return Err(MgError::InvalidHierarchy(format!(
                    "prolongation to level {} produces {} rows, next level expects {}",
                    min_level + i + 1,
                    pair[0].nrows(),
                    pair[1].ncols()
                )));
            }
        }
        let mut levels = Vec::with_capacity(prolongations.len());
        for (i, (p, e)) in prolongations.into_iter().zip(edges).enumerate() {
            let full = match &e {
                Some(e) => {
                    if (e.nrows(), e.ncols()) != (p.nrows(), p.ncols()) {
                        return Err(MgError::InvalidHierarchy(format!(
                            "edge prolongation on level {} is {}x{}, expected {}x{}",
                            min_level + i + 1,
                            e.nrows(),
                            e.ncols(),
                            p.nrows(),
                            p.ncols()
                        )));
                    }
                    p.add(e)
                }
                None => p.clone(),
            };
            levels.push(LevelTransfer { restriction: full.transpose(), prolongation: p, edge: e });
        }
        Ok(Self { min_level, levels })
    }

    fn level(&self, level: usize) -> &LevelTransfer {
        assert!(level > self.min_level, "no transfer below level {}", self.min_level);
        &self.levels[level - self.min_level - 1]
    }

    pub fn prolongation(&self, level: usize) -> &CsrMatrix {
        &self.level(level).prolongation
    }
}

impl<V: MgVector> MgTransfer<V> for MatrixTransfer {
    fn restrict_and_add(&self, level: usize, dst: &mut V, src: &V) {
        src.update_ghost_values();
        self.level(level).restriction.spmv_add(src.local_values(), dst.local_values_mut());
    }

    fn prolongate_and_add(&self, level: usize, dst: &mut V, src: &V) {
        src.update_ghost_values();
        self.level(level).prolongation.spmv_add(src.local_values(), dst.local_values_mut());
    }

    fn has_edge_dofs(&self, level: usize) -> bool {
        self.level(level).edge.is_some()
    }

    fn edge_prolongate_and_add(&self, level: usize, dst: &mut V, src: &V) {
        if let Some(edge) = &self.level(level).edge {
            edge.spmv_add(src.local_values(), dst.local_values_mut());
        }
    }

    fn level_range(&self) -> Option<(usize, usize)> {
        Some((self.min_level, self.min_level + self.levels.len()))
    }
}
