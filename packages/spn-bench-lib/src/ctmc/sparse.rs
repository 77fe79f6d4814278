use ndarray::Array1;

/// Triplet-form sparse matrix used during assembly. Duplicate `(row, col)`
/// entries are summed when converting to compressed form.
#[derive(Debug, Clone)]
pub struct CooMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl CooMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        CooMatrix {
            rows,
            cols,
            entries: vec![],
        }
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.entries.push((row, col, value));
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn to_csc(mut self) -> CscMatrix {
        self.entries
            .sort_unstable_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

        let mut col_ptr = Vec::with_capacity(self.cols + 1);
        let mut row_idx = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());

        col_ptr.push(0);
        let mut current_col = 0;
        for (row, col, value) in self.entries {
            while current_col < col {
                col_ptr.push(row_idx.len());
                current_col += 1;
            }
            if let Some(&last_row) = row_idx.last()
                && last_row == row
                && col_ptr.last().copied().unwrap_or(0) < row_idx.len()
            {
                // duplicate entry within the same column, sum it
                *values.last_mut().unwrap() += value;
            } else {
                row_idx.push(row);
                values.push(value);
            }
        }
        while current_col < self.cols {
            col_ptr.push(row_idx.len());
            current_col += 1;
        }

        CscMatrix {
            rows: self.rows,
            cols: self.cols,
            col_ptr,
            row_idx,
            values,
        }
    }
}

/// Compressed sparse column matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    rows: usize,
    cols: usize,
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CscMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates the `(row, value)` entries of column `col`.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.col_ptr[col]..self.col_ptr[col + 1];
        self.row_idx[range.clone()]
            .iter()
            .zip(self.values[range].iter())
            .map(|(&r, &v)| (r, v))
    }

    /// `A * x`.
    pub fn mat_vec(&self, x: &Array1<f64>) -> Array1<f64> {
        debug_assert_eq!(x.len(), self.cols);
        let mut y = Array1::zeros(self.rows);
        for col in 0..self.cols {
            let xj = x[col];
            if xj == 0.0 {
                continue;
            }
            for (row, value) in self.column(col) {
                y[row] += value * xj;
            }
        }
        y
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.column(col)
            .find(|&(r, _)| r == row)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }
}
