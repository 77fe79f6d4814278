use ndarray::Array1;

use crate::ctmc::{solve::SolveError, sparse::CscMatrix};

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Sparse LU factorization `PA = LU` with partial pivoting.
///
/// Left-looking (Gilbert-Peierls) factorization: each column of `A` is
/// solved against the already-computed columns of `L` via a sparse
/// triangular solve whose fill pattern is discovered by depth-first search,
/// then the largest remaining entry is chosen as pivot.
#[derive(Debug, Clone)]
pub struct LuFactors {
    n: usize,
    /// Column `j` of `L` without the unit diagonal; row indices are original
    /// (unpermuted) rows, all of which pivot at positions greater than `j`.
    l_cols: Vec<Vec<(usize, f64)>>,
    /// Column `j` of `U` without the diagonal; row indices are pivot
    /// positions, all smaller than `j`.
    u_cols: Vec<Vec<(usize, f64)>>,
    u_diag: Vec<f64>,
    /// `p[j]` is the original row pivoting at position `j`.
    p: Vec<usize>,
}

impl LuFactors {
    pub fn factorize(a: &CscMatrix) -> Result<Self, SolveError> {
        assert_eq!(a.rows(), a.cols(), "LU factorization needs a square matrix");
        let n = a.rows();

        // pinv[original row] = pivot position, usize::MAX while unpivoted
        let mut pinv = vec![usize::MAX; n];
        let mut p = vec![0usize; n];
        let mut l_cols: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_cols: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_diag = Vec::with_capacity(n);

        let mut x = vec![0.0; n];
        let mut mark = vec![usize::MAX; n];
        let mut topo: Vec<usize> = Vec::with_capacity(n);

        for j in 0..n {
            // symbolic step: rows reachable from the pattern of A[:, j]
            // through the columns of L, in postorder
            topo.clear();
            for (row, _) in a.column(j) {
                if mark[row] != j {
                    reach(row, j, &mut mark, &l_cols, &pinv, &mut topo);
                }
            }

            // numeric step: sparse triangular solve in topological order
            for &i in topo.iter() {
                x[i] = 0.0;
            }
            for (row, value) in a.column(j) {
                x[row] = value;
            }
            for &i in topo.iter().rev() {
                let k = pinv[i];
                if k == usize::MAX {
                    continue;
                }
                let xi = x[i];
                if xi != 0.0 {
                    for &(r, lv) in &l_cols[k] {
                        x[r] -= lv * xi;
                    }
                }
            }

            // partial pivoting over the unpivoted pattern rows
            let mut pivot_row = usize::MAX;
            let mut pivot_abs = 0.0;
            for &i in topo.iter() {
                if pinv[i] == usize::MAX && x[i].abs() > pivot_abs {
                    pivot_abs = x[i].abs();
                    pivot_row = i;
                }
            }
            if pivot_row == usize::MAX || pivot_abs < PIVOT_TOLERANCE {
                return Err(SolveError::Singular { column: j });
            }

            let pivot_value = x[pivot_row];
            let mut u_col = vec![];
            let mut l_col = vec![];
            for &i in topo.iter() {
                let k = pinv[i];
                if k != usize::MAX {
                    u_col.push((k, x[i]));
                } else if i != pivot_row {
                    let v = x[i] / pivot_value;
                    if v != 0.0 {
                        l_col.push((i, v));
                    }
                }
            }

            pinv[pivot_row] = j;
            p[j] = pivot_row;
            u_diag.push(pivot_value);
            u_cols.push(u_col);
            l_cols.push(l_col);
        }

        Ok(LuFactors {
            n,
            l_cols,
            u_cols,
            u_diag,
            p,
        })
    }

    /// Solves `A x = b` using the factors.
    pub fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        debug_assert_eq!(b.len(), self.n);

        // forward solve L z = P b; the workspace is indexed by original row
        let mut work = b.to_vec();
        let mut z = vec![0.0; self.n];
        for j in 0..self.n {
            let zj = work[self.p[j]];
            z[j] = zj;
            if zj != 0.0 {
                for &(r, lv) in &self.l_cols[j] {
                    work[r] -= lv * zj;
                }
            }
        }

        // backward solve U x = z
        let mut x = z;
        for j in (0..self.n).rev() {
            x[j] /= self.u_diag[j];
            let xj = x[j];
            if xj != 0.0 {
                for &(k, uv) in &self.u_cols[j] {
                    x[k] -= uv * xj;
                }
            }
        }

        Array1::from(x)
    }
}

/// Depth-first search from `root` through the columns of `L`, appending
/// finished nodes to `topo` in postorder. `mark` entries equal to `j` flag
/// nodes already visited for the current column.
fn reach(
    root: usize,
    j: usize,
    mark: &mut [usize],
    l_cols: &[Vec<(usize, f64)>],
    pinv: &[usize],
    topo: &mut Vec<usize>,
) {
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    mark[root] = j;

    while let Some(&(node, next_child)) = stack.last() {
        let children: &[(usize, f64)] = match pinv[node] {
            usize::MAX => &[],
            k => &l_cols[k],
        };

        if next_child < children.len() {
            stack.last_mut().unwrap().1 += 1;
            let child = children[next_child].0;
            if mark[child] != j {
                mark[child] = j;
                stack.push((child, 0));
            }
        } else {
            topo.push(node);
            stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctmc::sparse::CooMatrix;

    fn dense_to_csc(rows: &[&[f64]]) -> CscMatrix {
        let mut coo = CooMatrix::new(rows.len(), rows[0].len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    coo.push(i, j, v);
                }
            }
        }
        coo.to_csc()
    }

    #[test]
    fn solves_identity() {
        let a = dense_to_csc(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let b = Array1::from(vec![3.0, -2.0]);

        let lu = LuFactors::factorize(&a).unwrap();
        assert_eq!(lu.solve(&b), b);
    }

    #[test]
    fn solves_dense_system() {
        // A = [[2,1,0],[1,3,1],[0,1,4]], x = [1,-1,2] -> b = [1,0,7]
        let a = dense_to_csc(&[&[2.0, 1.0, 0.0], &[1.0, 3.0, 1.0], &[0.0, 1.0, 4.0]]);
        let b = Array1::from(vec![1.0, 0.0, 7.0]);

        let lu = LuFactors::factorize(&a).unwrap();
        let x = lu.solve(&b);

        for (got, want) in x.iter().zip([1.0, -1.0, 2.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn pivots_through_zero_diagonal() {
        // zero on the diagonal forces a row swap
        let a = dense_to_csc(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let b = Array1::from(vec![5.0, 7.0]);

        let lu = LuFactors::factorize(&a).unwrap();
        let x = lu.solve(&b);

        assert!((x[0] - 7.0).abs() < 1e-12);
        assert!((x[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn detects_singular_matrix() {
        let a = dense_to_csc(&[&[1.0, 2.0], &[2.0, 4.0]]);

        assert!(matches!(
            LuFactors::factorize(&a),
            Err(SolveError::Singular { .. })
        ));
    }

    #[test]
    fn residual_stays_small_on_random_sparse_system() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(42);
        let n = 40;
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            // diagonally dominant so the system is well conditioned
            coo.push(i, i, 10.0 + rng.gen_range(0.0..1.0));
            for _ in 0..3 {
                let j = rng.gen_range(0..n);
                if j != i {
                    coo.push(i, j, rng.gen_range(-1.0..1.0));
                }
            }
        }
        let a = coo.to_csc();
        let b = Array1::from((0..n).map(|i| (i % 7) as f64).collect::<Vec<_>>());

        let lu = LuFactors::factorize(&a).unwrap();
        let x = lu.solve(&b);
        let r = &a.mat_vec(&x) - &b;

        assert!(r.iter().all(|v| v.abs() < 1e-9));
    }
}
