use ndarray::{Array1, Array2};

use crate::ctmc::{solve::SolveError, sparse::CscMatrix};

/// Restarted GMRES without preconditioning.
///
/// Arnoldi with modified Gram-Schmidt builds the Krylov basis; Givens
/// rotations keep the least-squares problem triangular so the residual norm
/// is available at every inner step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmresOptions {
    /// Krylov subspace dimension before restarting.
    pub restart: usize,
    /// Maximum number of outer (restart) cycles.
    pub max_restarts: usize,
    /// Relative residual target `||b - Ax|| <= tolerance * ||b||`.
    pub tolerance: f64,
}

impl Default for GmresOptions {
    fn default() -> Self {
        GmresOptions {
            restart: 30,
            max_restarts: 100,
            tolerance: 1e-10,
        }
    }
}

pub fn gmres(
    a: &CscMatrix,
    b: &Array1<f64>,
    options: &GmresOptions,
) -> Result<Array1<f64>, SolveError> {
    let n = b.len();
    let m = options.restart.min(n).max(1);

    let b_norm = norm(b);
    if b_norm == 0.0 {
        return Ok(Array1::zeros(n));
    }
    let target = options.tolerance * b_norm;

    let mut x = Array1::zeros(n);
    let mut iterations = 0;
    let mut residual_norm = f64::INFINITY;

    for _ in 0..options.max_restarts {
        let r = b - &a.mat_vec(&x);
        let beta = norm(&r);
        residual_norm = beta;
        if beta <= target {
            return Ok(x);
        }

        // Krylov basis vectors as rows
        let mut basis = Array2::zeros((m + 1, n));
        basis.row_mut(0).assign(&(&r / beta));

        let mut h = Array2::zeros((m + 1, m));
        let mut cs = vec![0.0f64; m];
        let mut sn = vec![0.0f64; m];
        let mut g = Array1::zeros(m + 1);
        g[0] = beta;

        let mut k_used = 0;
        for k in 0..m {
            iterations += 1;

            let mut w = a.mat_vec(&basis.row(k).to_owned());
            for i in 0..=k {
                let hik = w.dot(&basis.row(i));
                h[[i, k]] = hik;
                w.scaled_add(-hik, &basis.row(i));
            }
            let wnorm = norm(&w);
            h[[k + 1, k]] = wnorm;

            let happy = wnorm < f64::EPSILON * b_norm;
            if !happy {
                basis.row_mut(k + 1).assign(&(&w / wnorm));
            }

            // fold previous rotations into the new column, then zero the
            // subdiagonal with a fresh rotation
            for i in 0..k {
                let t = cs[i] * h[[i, k]] + sn[i] * h[[i + 1, k]];
                h[[i + 1, k]] = -sn[i] * h[[i, k]] + cs[i] * h[[i + 1, k]];
                h[[i, k]] = t;
            }
            let (c, s) = givens(h[[k, k]], h[[k + 1, k]]);
            cs[k] = c;
            sn[k] = s;
            h[[k, k]] = c * h[[k, k]] + s * h[[k + 1, k]];
            h[[k + 1, k]] = 0.0;
            g[k + 1] = -s * g[k];
            g[k] *= c;

            k_used = k + 1;
            residual_norm = g[k + 1].abs();
            if residual_norm <= target || happy {
                break;
            }
        }

        if k_used == 0 {
            return Err(SolveError::Breakdown {
                iteration: iterations,
            });
        }

        // back substitution on the triangularized Hessenberg system
        let mut y = vec![0.0f64; k_used];
        for i in (0..k_used).rev() {
            let mut sum = g[i];
            for j in i + 1..k_used {
                sum -= h[[i, j]] * y[j];
            }
            let hii = h[[i, i]];
            if hii.abs() < f64::EPSILON {
                return Err(SolveError::Breakdown {
                    iteration: iterations,
                });
            }
            y[i] = sum / hii;
        }
        for (j, &yj) in y.iter().enumerate() {
            x.scaled_add(yj, &basis.row(j));
        }

        if residual_norm <= target {
            let true_residual = norm(&(b - &a.mat_vec(&x)));
            if true_residual <= target * 10.0 {
                return Ok(x);
            }
        }
    }

    Err(SolveError::DidNotConverge {
        iterations,
        residual: residual_norm,
    })
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

fn givens(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        (1.0, 0.0)
    } else if a.abs() < b.abs() {
        let t = a / b;
        let s = 1.0 / (1.0 + t * t).sqrt();
        (s * t, s)
    } else {
        let t = b / a;
        let c = 1.0 / (1.0 + t * t).sqrt();
        (c, c * t)
    }
}
