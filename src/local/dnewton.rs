//! Deflated Newton, hand-rolled: the one local method this crate doesn't
//! delegate to `nlopt` for, since it needs the deflation term folded
//! directly into the linear system rather than just the gradient.
//!
//! Ported in spirit (not in code) from `original_source/hgdl/local_methods/dNewton.py`:
//! Newton step with a `numpy.linalg.solve` / least-squares fallback and a
//! forward-difference Hessian when none is supplied, plus the spec's own
//! addition of a projected backtracking descent as an escape hatch.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2};

use crate::deflation::deflation_value_grad;
use crate::local::LocalResult;
use crate::problem::Problem;

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (r, c) = a.dim();
    match a.as_slice() {
        Some(s) => DMatrix::from_row_slice(r, c, s),
        None => DMatrix::from_row_slice(r, c, &a.iter().cloned().collect::<Vec<_>>()),
    }
}

fn to_dvector(a: &Array1<f64>) -> DVector<f64> {
    match a.as_slice() {
        Some(s) => DVector::from_row_slice(s),
        None => DVector::from_row_slice(&a.iter().cloned().collect::<Vec<_>>()),
    }
}

fn from_dvector(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_vec(v.iter().copied().collect())
}

/// Eigenvalues of a (symmetric) Hessian, used both for the Newton escape
/// criterion and for classifying a converged point as min/max/saddle.
pub fn eigvals_of(h: &Array2<f64>) -> Array1<f64> {
    let eigen = SymmetricEigen::new(to_dmatrix(h));
    from_dvector(&eigen.eigenvalues)
}

/// Forward-difference Hessian approximation: one extra gradient
/// evaluation per dimension, symmetrized afterwards.
fn approximate_hessian<A: Send + Sync>(problem: &Problem<A>, x: &Array1<f64>, g0: &Array1<f64>) -> Array2<f64> {
    let n = x.len();
    let eps = 1e-6;
    let mut h = Array2::zeros((n, n));
    for i in 0..n {
        let mut xp = x.clone();
        xp[i] += eps;
        let gi = (problem.grad)(&xp, &problem.args);
        let col = (&gi - g0) / eps;
        for j in 0..n {
            h[[j, i]] = col[j];
        }
    }
    let ht = h.t().to_owned();
    (h + ht) * 0.5
}

/// Solves `(H + outer(g, grad_d)/d) * gamma = -g`. The rank-1 update is
/// intentionally asymmetric: it comes from differentiating `g/d` by parts,
/// not from any symmetrized correction, and is kept exactly as specified.
/// Falls back to a minimum-norm least-squares solve (via SVD) if the
/// direct LU solve hits a singular matrix.
fn solve_deflated_system(h: &Array2<f64>, g: &Array1<f64>, grad_d: &Array1<f64>, d: f64) -> Option<Array1<f64>> {
    let n = g.len();
    let mut a = h.clone();
    for i in 0..n {
        for j in 0..n {
            a[[i, j]] += g[i] * grad_d[j] / d;
        }
    }
    let a_na = to_dmatrix(&a);
    let b_na = to_dvector(&g.mapv(|v| -v));

    if let Some(sol) = a_na.clone().lu().solve(&b_na) {
        return Some(from_dvector(&sol));
    }
    a_na.svd(true, true).solve(&b_na, 1e-10).ok().map(|sol| from_dvector(&sol))
}

/// Projected backtracking gradient descent on the deflated gradient field
/// `-d(x) * grad f(x)`. Used both as the Newton escape hatch (iteration
/// budget exhausted, or the Newton step would leave the box) and as the
/// terminal fallback when the Newton linear solve fails outright.
fn escape_descent<A: Send + Sync>(
    problem: &Problem<A>,
    x_start: &Array1<f64>,
    x_defl: &[Array1<f64>],
    r: f64,
    tol: f64,
) -> LocalResult {
    const MAX_DESCENT_ITERS: usize = 20;
    const MAX_BACKTRACKS: usize = 10;
    const BETA: f64 = 0.5;

    let mut x = x_start.clone();
    for _ in 0..MAX_DESCENT_ITERS {
        let g = (problem.grad)(&x, &problem.args);
        let (d, _) = deflation_value_grad(&x, x_defl, r);
        let g_defl = &g * d;
        let gnorm2 = g_defl.mapv(|v| v * v).sum();
        let gnorm = gnorm2.sqrt();
        if gnorm < tol {
            let eigvals = problem.hess.as_ref().map(|hf| eigvals_of(&hf(&x, &problem.args)));
            return LocalResult {
                x: x.clone(),
                f_val: (problem.f)(&x, &problem.args),
                grad_norm: gnorm,
                eigvals,
                success: true,
            };
        }

        let fx = (problem.f)(&x, &problem.args);
        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let x_try = &x - &(&g_defl * step);
            if problem.bounds.in_box(&x_try) {
                let f_try = (problem.f)(&x_try, &problem.args);
                if f_try <= fx - 0.5 * step * gnorm2 {
                    accepted = Some(x_try);
                    break;
                }
            }
            step *= BETA;
        }
        match accepted {
            Some(x_next) => x = x_next,
            None => {
                return LocalResult {
                    x,
                    f_val: fx,
                    grad_norm: gnorm,
                    eigvals: None,
                    success: false,
                };
            }
        }
    }
    let fx = (problem.f)(&x, &problem.args);
    LocalResult {
        x,
        f_val: fx,
        grad_norm: f64::NAN,
        eigvals: None,
        success: false,
    }
}

/// Runs the deflated Newton method from `x0` against the current
/// deflation set `x_defl`, returning as soon as the deflated gradient norm
/// drops below `tol` or falling back to [`escape_descent`] once the
/// iteration budget is spent or a step would leave the box.
pub fn deflated_newton<A: Send + Sync>(
    problem: &Problem<A>,
    x0: &Array1<f64>,
    x_defl: &[Array1<f64>],
    r: f64,
    max_iter: usize,
    tol: f64,
) -> LocalResult {
    let mut x = x0.clone();

    for _iter in 0..max_iter {
        let g = (problem.grad)(&x, &problem.args);
        let (d, grad_d) = deflation_value_grad(&x, x_defl, r);
        let deflated_norm = (g.mapv(|v| v * v).sum()).sqrt() * d;

        if deflated_norm < tol {
            let eigvals = problem.hess.as_ref().map(|hf| eigvals_of(&hf(&x, &problem.args)));
            return LocalResult {
                x: x.clone(),
                f_val: (problem.f)(&x, &problem.args),
                grad_norm: deflated_norm,
                eigvals,
                success: true,
            };
        }

        if d == 0.0 {
            // x sits exactly on a deflation point: the update is 0/0 and
            // ill-defined, not just slow to converge.
            return LocalResult {
                x: x.clone(),
                f_val: (problem.f)(&x, &problem.args),
                grad_norm: f64::INFINITY,
                eigvals: None,
                success: false,
            };
        }

        let h = match &problem.hess {
            Some(hf) => hf(&x, &problem.args),
            None => approximate_hessian(problem, &x, &g),
        };

        let gamma = match solve_deflated_system(&h, &g, &grad_d, d) {
            Some(gm) => gm,
            None => return escape_descent(problem, &x, x_defl, r, tol),
        };

        let x_next = &x + &gamma;
        if !problem.bounds.in_box(&x_next) {
            return escape_descent(problem, &x, x_defl, r, tol);
        }
        x = x_next;
    }

    escape_descent(problem, &x, x_defl, r, tol)
}
