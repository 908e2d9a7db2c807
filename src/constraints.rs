//! Constraint lifting: turns a constrained problem into an unconstrained
//! one over an extended variable `[x, lambda_1..lambda_k, s_1..s_m]`, per
//! the augmented-Lagrangian construction the spec lays out. Equality
//! constraints only get a multiplier; inequality constraints additionally
//! get a slack variable whose square absorbs the sign of the residual.

use std::sync::Arc;

use ndarray::{s, Array1};

use crate::bounds::Bounds;
use crate::problem::Problem;

/// Which side of `value` the constraint function `nlc` must land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Eq,
    Lt,
    Gt,
}

/// One constraint `nlc(x) {==,<=,>=} value`, with the multiplier/slack
/// bounds and starting values used when building the lifted problem.
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: f64,
    pub nlc: Arc<dyn Fn(&Array1<f64>) -> f64 + Send + Sync>,
    pub nlc_grad: Arc<dyn Fn(&Array1<f64>) -> Array1<f64> + Send + Sync>,
    pub lambda_bounds: (f64, f64),
    pub slack_bounds: (f64, f64),
    pub initial_lambda: f64,
    pub initial_slack: f64,
}

impl Constraint {
    pub fn equality(
        value: f64,
        nlc: impl Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
        nlc_grad: impl Fn(&Array1<f64>) -> Array1<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ConstraintKind::Eq,
            value,
            nlc: Arc::new(nlc),
            nlc_grad: Arc::new(nlc_grad),
            lambda_bounds: (-1e6, 1e6),
            slack_bounds: (0.0, 0.0),
            initial_lambda: 0.0,
            initial_slack: 0.0,
        }
    }

    pub fn inequality(
        kind: ConstraintKind,
        value: f64,
        nlc: impl Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
        nlc_grad: impl Fn(&Array1<f64>) -> Array1<f64> + Send + Sync + 'static,
    ) -> Self {
        assert!(kind != ConstraintKind::Eq, "use Constraint::equality for equality constraints");
        Self {
            kind,
            value,
            nlc: Arc::new(nlc),
            nlc_grad: Arc::new(nlc_grad),
            lambda_bounds: (0.0, 1e6),
            slack_bounds: (-1e3, 1e3),
            initial_lambda: 0.0,
            initial_slack: 0.0,
        }
    }
}

struct LiftMeta {
    d: usize,
    k: usize,
    constraints: Vec<Constraint>,
    /// Index into the slack block for each constraint, `None` for
    /// equality constraints (they carry no slack).
    slack_col: Vec<Option<usize>>,
}

/// Total dimension of the lifted variable: original `x` plus one
/// multiplier per constraint plus one slack per inequality constraint.
pub fn lifted_dim(d: usize, constraints: &[Constraint]) -> usize {
    let m = constraints.iter().filter(|c| c.kind != ConstraintKind::Eq).count();
    d + constraints.len() + m
}

/// Builds the starting point for the lifted problem: the caller's
/// original `x0`, followed by each constraint's `initial_lambda`,
/// followed by each inequality constraint's `initial_slack`.
pub fn extend_x0(x0: &Array1<f64>, constraints: &[Constraint]) -> Array1<f64> {
    let mut out: Vec<f64> = x0.iter().copied().collect();
    out.extend(constraints.iter().map(|c| c.initial_lambda));
    out.extend(
        constraints
            .iter()
            .filter(|c| c.kind != ConstraintKind::Eq)
            .map(|c| c.initial_slack),
    );
    Array1::from_vec(out)
}

/// Lifts a problem with `d`-dimensional `x` and a list of constraints
/// into an unconstrained problem over the extended variable. The user's
/// analytic Hessian, if any, no longer matches the lifted Lagrangian's
/// curvature and is dropped; the lifted problem always uses the
/// forward-difference Hessian approximation.
pub fn lift<A: Send + Sync + 'static>(problem: Problem<A>, constraints: Vec<Constraint>) -> Problem<A> {
    let d = problem.bounds.dim();
    let k = constraints.len();
    let slack_col: Vec<Option<usize>> = {
        let mut next = 0usize;
        constraints
            .iter()
            .map(|c| {
                if c.kind == ConstraintKind::Eq {
                    None
                } else {
                    let slot = next;
                    next += 1;
                    Some(slot)
                }
            })
            .collect()
    };
    let m = slack_col.iter().filter(|s| s.is_some()).count();
    let total = d + k + m;

    let mut lo = Array1::zeros(total);
    let mut hi = Array1::zeros(total);
    lo.slice_mut(s![0..d]).assign(problem.bounds.lo());
    hi.slice_mut(s![0..d]).assign(problem.bounds.hi());
    for (i, c) in constraints.iter().enumerate() {
        lo[d + i] = c.lambda_bounds.0;
        hi[d + i] = c.lambda_bounds.1;
    }
    for (i, c) in constraints.iter().enumerate() {
        if let Some(slot) = slack_col[i] {
            lo[d + k + slot] = c.slack_bounds.0;
            hi[d + k + slot] = c.slack_bounds.1;
        }
    }
    let lifted_bounds = Bounds::new(lo, hi).expect("lifted bounds built from already-validated pieces");

    let meta = Arc::new(LiftMeta { d, k, constraints, slack_col });
    let orig_f = problem.f;
    let orig_grad = problem.grad;
    let args = problem.args;

    let meta_f = meta.clone();
    let lifted_f = move |x: &Array1<f64>, a: &A| -> f64 {
        let x_orig = x.slice(s![0..meta_f.d]).to_owned();
        let mut val = (orig_f)(&x_orig, a);
        for (i, c) in meta_f.constraints.iter().enumerate() {
            let lambda = x[meta_f.d + i];
            let mut residual = (c.nlc)(&x_orig) - c.value;
            if let Some(slot) = meta_f.slack_col[i] {
                let slack = x[meta_f.d + meta_f.k + slot];
                let sign = if c.kind == ConstraintKind::Lt { 1.0 } else { -1.0 };
                residual += sign * slack * slack;
            }
            val += lambda * residual;
        }
        val
    };

    let meta_g = meta;
    let lifted_grad = move |x: &Array1<f64>, a: &A| -> Array1<f64> {
        let x_orig = x.slice(s![0..meta_g.d]).to_owned();
        let mut grad = Array1::zeros(x.len());
        let g_orig = (orig_grad)(&x_orig, a);
        grad.slice_mut(s![0..meta_g.d]).assign(&g_orig);
        for (i, c) in meta_g.constraints.iter().enumerate() {
            let lambda = x[meta_g.d + i];
            let residual0 = (c.nlc)(&x_orig) - c.value;
            let grad_g = (c.nlc_grad)(&x_orig);
            for j in 0..meta_g.d {
                grad[j] += lambda * grad_g[j];
            }
            let mut residual = residual0;
            if let Some(slot) = meta_g.slack_col[i] {
                let slack = x[meta_g.d + meta_g.k + slot];
                let sign = if c.kind == ConstraintKind::Lt { 1.0 } else { -1.0 };
                residual += sign * slack * slack;
                grad[meta_g.d + meta_g.k + slot] += sign * 2.0 * lambda * slack;
            }
            grad[meta_g.d + i] = residual;
        }
        grad
    };

    Problem {
        bounds: lifted_bounds,
        f: Box::new(lifted_f),
        grad: Box::new(lifted_grad),
        hess: None,
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifted_minimum_of_a_circle_constrained_quadratic_matches_the_analytic_solution() {
        // minimize x^2 + y^2 subject to x + y == 1; analytic solution (0.5, 0.5).
        let bounds = Bounds::from_pairs(&[(-10.0, 10.0), (-10.0, 10.0)]).unwrap();
        let problem = Problem::new(
            bounds,
            |x: &Array1<f64>, _: &()| x[0] * x[0] + x[1] * x[1],
            |x: &Array1<f64>, _: &()| Array1::from_vec(vec![2.0 * x[0], 2.0 * x[1]]),
            (),
        );
        let constraint = Constraint::equality(
            1.0,
            |x: &Array1<f64>| x[0] + x[1],
            |x: &Array1<f64>| Array1::from_vec(vec![1.0; x.len()]),
        );
        assert_eq!(lifted_dim(2, std::slice::from_ref(&constraint)), 3);
        let lifted = lift(problem, vec![constraint]);
        assert_eq!(lifted.dim(), 3);

        // At the analytic saddle point of the Lagrangian, the lifted gradient
        // must vanish: grad L = (2x + lambda, 2y + lambda, x + y - 1).
        let x_star = Array1::from_vec(vec![0.5, 0.5, -1.0]);
        let g = (lifted.grad)(&x_star, &lifted.args);
        for v in g.iter() {
            assert!(v.abs() < 1e-9, "expected a stationary point of the Lagrangian, got grad={:?}", g);
        }
    }

    #[test]
    fn extend_x0_appends_lambda_then_slack() {
        let mut c = Constraint::inequality(
            ConstraintKind::Lt,
            0.0,
            |x: &Array1<f64>| x[0],
            |x: &Array1<f64>| Array1::from_vec(vec![1.0; x.len()]),
        );
        c.initial_lambda = 0.1;
        c.initial_slack = 0.2;
        let x0 = Array1::from_vec(vec![1.0, 2.0]);
        let extended = extend_x0(&x0, &[c]);
        assert_eq!(extended, Array1::from_vec(vec![1.0, 2.0, 0.1, 0.2]));
    }
}
