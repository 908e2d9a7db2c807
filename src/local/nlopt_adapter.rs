//! Adapts the `LBFGSB`/`BFGS`/`CG`/`Newton-CG` local methods onto `nlopt`
//! algorithms, the way `src-autoeq/src/optim_nlopt.rs` drives `Nlopt` for
//! AutoEQ's own filter fitting: a free objective function plus a
//! user-data struct, rather than a capturing closure.

use ndarray::Array1;
use nlopt::{Algorithm, Nlopt, Target};

use crate::deflation::deflation_value_grad;
use crate::local::dnewton::eigvals_of;
use crate::local::{LocalMethod, LocalResult};
use crate::problem::Problem;

struct ObjectiveData<'a, A> {
    problem: &'a Problem<A>,
    x_defl: &'a [Array1<f64>],
    r: f64,
}

/// The deflated objective every `nlopt` algorithm actually minimizes:
/// reported value is `f(x)`, reported gradient is `d(x) * grad f(x)` — the
/// same deflated gradient field the Newton escape descent follows, kept
/// consistent across every local method rather than re-deriving a true
/// gradient of some `f`/`d` composite.
fn deflated_objective<A: Send + Sync>(x: &[f64], gradient: Option<&mut [f64]>, data: &mut ObjectiveData<A>) -> f64 {
    let xv = Array1::from_vec(x.to_vec());
    let fval = (data.problem.f)(&xv, &data.problem.args);
    if let Some(g_out) = gradient {
        let g = (data.problem.grad)(&xv, &data.problem.args);
        let (d, _grad_d) = deflation_value_grad(&xv, data.x_defl, data.r);
        for (slot, gi) in g_out.iter_mut().zip(g.iter()) {
            *slot = gi * d;
        }
    }
    fval
}

pub(crate) fn minimize_nlopt<A: Send + Sync>(
    method: &LocalMethod<A>,
    problem: &Problem<A>,
    x0: &Array1<f64>,
    x_defl: &[Array1<f64>],
    r: f64,
    max_iter: usize,
    tol: f64,
) -> LocalResult {
    let algo = match method {
        LocalMethod::LBfgsB => Algorithm::Lbfgs,
        LocalMethod::Bfgs => Algorithm::Var2,
        LocalMethod::Cg => Algorithm::TNewton,
        LocalMethod::NewtonCg => Algorithm::TNewtonRestart,
        _ => unreachable!("minimize_nlopt dispatched with a non-nlopt method"),
    };

    let n = x0.len();
    let data = ObjectiveData { problem, x_defl, r };
    let mut optimizer = Nlopt::new(algo, n, deflated_objective::<A>, Target::Minimize, data);
    let _ = optimizer.set_lower_bounds(problem.bounds.lo().as_slice().expect("contiguous bounds array"));
    let _ = optimizer.set_upper_bounds(problem.bounds.hi().as_slice().expect("contiguous bounds array"));
    let _ = optimizer.set_maxeval((max_iter as u32).saturating_mul(50));
    let _ = optimizer.set_ftol_rel(tol);
    let _ = optimizer.set_xtol_rel(tol);

    let mut x = x0.to_vec();
    let ran_ok = optimizer.optimize(&mut x).is_ok();
    let x_final = Array1::from_vec(x);

    let g = (problem.grad)(&x_final, &problem.args);
    let (d, _) = deflation_value_grad(&x_final, x_defl, r);
    let deflated_norm = g.mapv(|v| v * v).sum().sqrt() * d;
    let eigvals = problem.hess.as_ref().map(|hf| eigvals_of(&hf(&x_final, &problem.args)));
    let success = ran_ok && problem.bounds.in_box(&x_final) && deflated_norm < tol.max(1e-3);

    LocalResult {
        f_val: (problem.f)(&x_final, &problem.args),
        x: x_final,
        grad_norm: deflated_norm,
        eigvals,
        success,
    }
}
