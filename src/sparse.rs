// 🕸️ Sparse Matrix - compressed sparse row storage

use serde::{Deserialize, Serialize};

/// Compressed sparse row matrix of `f64`
///
/// Row `i` owns `indices[indptr[i]..indptr[i + 1]]` (sorted column indices)
/// and the matching slice of `data`. Only non-zero entries are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// All-zero matrix of the given shape
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        CsrMatrix {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Compress a dense row-major grid, dropping zeros
    pub fn from_dense(n_rows: usize, n_cols: usize, values: &[f64]) -> Self {
        debug_assert_eq!(values.len(), n_rows * n_cols);

        let mut matrix = CsrMatrix::zeros(n_rows, n_cols);
        for row in 0..n_rows {
            for col in 0..n_cols {
                let v = values[row * n_cols + col];
                if v != 0.0 {
                    matrix.indices.push(col);
                    matrix.data.push(v);
                }
            }
            matrix.indptr[row + 1] = matrix.indices.len();
        }
        matrix
    }

    /// Build from one `(column, value)` list per row
    ///
    /// Entries are sorted by column; zeros are dropped.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let mut matrix = CsrMatrix::zeros(rows.len(), n_cols);
        for (row, mut entries) in rows.into_iter().enumerate() {
            entries.sort_by_key(|(col, _)| *col);
            for (col, v) in entries {
                debug_assert!(col < n_cols);
                if v != 0.0 {
                    matrix.indices.push(col);
                    matrix.data.push(v);
                }
            }
            matrix.indptr[row + 1] = matrix.indices.len();
        }
        matrix
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Stored entries of one row as `(column, value)`
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.indptr[row]..self.indptr[row + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// Value at `(row, col)`; 0 when nothing is stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.n_rows {
            return 0.0;
        }
        let range = self.indptr[row]..self.indptr[row + 1];
        match self.indices[range.clone()].binary_search(&col) {
            Ok(offset) => self.data[range.start + offset],
            Err(_) => 0.0,
        }
    }

    /// Expand back to a dense row-major grid
    pub fn to_dense(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.n_rows * self.n_cols];
        for row in 0..self.n_rows {
            for (col, v) in self.row(row) {
                values[row * self.n_cols + col] = v;
            }
        }
        values
    }
}
