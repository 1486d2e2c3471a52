// Compressed sparse row storage for assembled level and transfer matrices

use faer::Mat;

/// A real sparse matrix in CSR format with sorted, duplicate-free rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build a CSR from raw row-ptr, col-idx, and values.
    ///
    /// # Panics
    /// Panics if the arrays are inconsistent with the given shape.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        assert_eq!(row_ptr.len(), nrows + 1, "row_ptr must have nrows + 1 entries");
        assert_eq!(col_idx.len(), values.len(), "col_idx and values differ in length");
        assert_eq!(row_ptr[nrows], values.len(), "row_ptr does not match nnz");
        assert!(col_idx.iter().all(|&j| j < ncols), "column index out of range");
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    /// Build from (row, col, value) triplets; duplicates are summed.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nrows];
        for &(i, j, v) in triplets {
            assert!(i < nrows && j < ncols, "triplet ({i}, {j}) out of range");
            rows[i].push((j, v));
        }
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(j, _)| j);
            for (j, v) in row {
                if col_idx.len() > *row_ptr.last().unwrap_or(&0) && col_idx.last() == Some(&j) {
                    if let Some(last) = values.last_mut() {
                        *last += v;
                    }
                } else {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    /// Square tridiagonal matrix with constant bands.
    pub fn tridiagonal(n: usize, sub: f64, diag: f64, sup: f64) -> Self {
        let mut triplets = Vec::with_capacity(3 * n);
        for i in 0..n {
            if i > 0 {
                triplets.push((i, i - 1, sub));
            }
            triplets.push((i, i, diag));
            if i + 1 < n {
                triplets.push((i, i + 1, sup));
            }
        }
        Self::from_triplets(n, n, &triplets)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }

    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols, "Input vector x has incorrect length");
        assert_eq!(y.len(), self.nrows, "Output vector y has incorrect length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            y.par_iter_mut().enumerate().for_each(|(i, yi)| {
                *yi = self.row(i).map(|(j, v)| v * x[j]).sum();
            });
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row(i).map(|(j, v)| v * x[j]).sum();
            }
        }
    }

    /// Compute y += A * x.
    pub fn spmv_add(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols, "Input vector x has incorrect length");
        assert_eq!(y.len(), self.nrows, "Output vector y has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi += self.row(i).map(|(j, v)| v * x[j]).sum::<f64>();
        }
    }

    /// Diagonal entries (zero where the row stores none).
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.nrows.min(self.ncols))
            .map(|i| self.row(i).find(|&(j, _)| j == i).map_or(0.0, |(_, v)| v))
            .collect()
    }

    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.ncols + 1];
        for &j in &self.col_idx {
            counts[j + 1] += 1;
        }
        for j in 0..self.ncols {
            counts[j + 1] += counts[j];
        }
        let row_ptr = counts.clone();
        let mut next = counts;
        let mut col_idx = vec![0; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        for i in 0..self.nrows {
            for (j, v) in self.row(i) {
                let slot = next[j];
                col_idx[slot] = i;
                values[slot] = v;
                next[j] += 1;
            }
        }
        Self { nrows: self.ncols, ncols: self.nrows, row_ptr, col_idx, values }
    }

    /// Entrywise sum of two matrices of equal shape.
    pub fn add(&self, other: &CsrMatrix) -> Self {
        assert_eq!((self.nrows, self.ncols), (other.nrows, other.ncols), "shape mismatch");
        let mut triplets = Vec::with_capacity(self.nnz() + other.nnz());
        for m in [self, other] {
            for i in 0..m.nrows {
                triplets.extend(m.row(i).map(|(j, v)| (i, j, v)));
            }
        }
        Self::from_triplets(self.nrows, self.ncols, &triplets)
    }

    /// Dense copy, for small coarse levels and direct factorizations.
    pub fn to_dense(&self) -> Mat<f64> {
        let mut dense = Mat::zeros(self.nrows, self.ncols);
        for i in 0..self.nrows {
            for (j, v) in self.row(i) {
                dense[(i, j)] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CsrMatrix::from_csr(3, 3, vec![0,1,2,3], vec![0,1,2], vec![1.0,1.0,1.0]);
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn simple_pattern() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_csr(
            2, 3,
            vec![0,2,4],
            vec![0,1,1,2],
            vec![1.0,2.0,3.0,4.0],
        );
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);

        let t = m.transpose();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        let mut z = vec![0.0; 3];
        t.spmv(&[1.0, 1.0], &mut z);
        assert_eq!(z, vec![1.0, 5.0, 4.0]);
    }

    #[test]
    fn triplets_sum_duplicates() {
        let m = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 2.0), (0, 0, 3.0)]);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.diagonal(), vec![4.0, 0.0]);
        let d = m.to_dense();
        assert_eq!(d[(1, 0)], 2.0);
    }

    #[test]
    fn tridiagonal_laplacian() {
        let a = CsrMatrix::tridiagonal(4, -1.0, 2.0, -1.0);
        let mut y = vec![0.0; 4];
        a.spmv(&[1.0; 4], &mut y);
        assert_eq!(y, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.add(&a).diagonal(), vec![4.0; 4]);
    }
}
