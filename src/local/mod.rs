//! Component C: local search. One hand-rolled deflated Newton method plus
//! four `nlopt`-backed adapters, all dispatched through [`LocalMethod`] so
//! the epoch engine never needs to know which one a walker is running.

pub mod dnewton;
#[cfg(feature = "nlopt")]
mod nlopt_adapter;

use std::fmt;
use std::sync::Arc;

use ndarray::Array1;

use crate::error::EngineError;
use crate::problem::Problem;

/// The outcome of one local search, converged or not.
#[derive(Debug, Clone)]
pub struct LocalResult {
    pub x: Array1<f64>,
    pub f_val: f64,
    pub grad_norm: f64,
    pub eigvals: Option<Array1<f64>>,
    pub success: bool,
}

type CustomLocalFn<A> =
    Arc<dyn Fn(&Problem<A>, &Array1<f64>, &[Array1<f64>], f64, usize, f64) -> LocalResult + Send + Sync>;

/// The pluggable local minimizer. `DNewton` is implemented directly in
/// [`dnewton`]; the rest are adapters onto `nlopt` algorithms operating on
/// the deflated objective (value `f(x)`, gradient `d(x) * grad f(x)`).
pub enum LocalMethod<A> {
    DNewton,
    LBfgsB,
    Bfgs,
    Cg,
    NewtonCg,
    Custom(CustomLocalFn<A>),
}

impl<A> Clone for LocalMethod<A> {
    fn clone(&self) -> Self {
        match self {
            LocalMethod::DNewton => LocalMethod::DNewton,
            LocalMethod::LBfgsB => LocalMethod::LBfgsB,
            LocalMethod::Bfgs => LocalMethod::Bfgs,
            LocalMethod::Cg => LocalMethod::Cg,
            LocalMethod::NewtonCg => LocalMethod::NewtonCg,
            LocalMethod::Custom(f) => LocalMethod::Custom(f.clone()),
        }
    }
}

impl<A> fmt::Debug for LocalMethod<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocalMethod::DNewton => "DNewton",
            LocalMethod::LBfgsB => "LBfgsB",
            LocalMethod::Bfgs => "Bfgs",
            LocalMethod::Cg => "Cg",
            LocalMethod::NewtonCg => "NewtonCg",
            LocalMethod::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

impl<A> LocalMethod<A> {
    /// Parses the spec's method-name strings (`"dNewton"`, `"L-BFGS-B"`,
    /// `"BFGS"`, `"CG"`, `"Newton-CG"`).
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name {
            "dNewton" => Ok(LocalMethod::DNewton),
            "L-BFGS-B" => Ok(LocalMethod::LBfgsB),
            "BFGS" => Ok(LocalMethod::Bfgs),
            "CG" => Ok(LocalMethod::Cg),
            "Newton-CG" => Ok(LocalMethod::NewtonCg),
            other => Err(EngineError::InvalidArgument(format!("unknown local method '{other}'"))),
        }
    }

    /// Whether this method needs the `nlopt` feature to actually run.
    pub fn requires_nlopt(&self) -> bool {
        matches!(
            self,
            LocalMethod::LBfgsB | LocalMethod::Bfgs | LocalMethod::Cg | LocalMethod::NewtonCg
        )
    }
}

impl<A: Send + Sync> LocalMethod<A> {
    pub fn minimize(
        &self,
        problem: &Problem<A>,
        x0: &Array1<f64>,
        x_defl: &[Array1<f64>],
        r: f64,
        max_iter: usize,
        tol: f64,
    ) -> LocalResult {
        match self {
            LocalMethod::DNewton => dnewton::deflated_newton(problem, x0, x_defl, r, max_iter, tol),
            #[cfg(feature = "nlopt")]
            LocalMethod::LBfgsB | LocalMethod::Bfgs | LocalMethod::Cg | LocalMethod::NewtonCg => {
                nlopt_adapter::minimize_nlopt(self, problem, x0, x_defl, r, max_iter, tol)
            }
            #[cfg(not(feature = "nlopt"))]
            LocalMethod::LBfgsB | LocalMethod::Bfgs | LocalMethod::Cg | LocalMethod::NewtonCg => LocalResult {
                x: x0.clone(),
                f_val: f64::NAN,
                grad_norm: f64::NAN,
                eigvals: None,
                success: false,
            },
            LocalMethod::Custom(f) => f(problem, x0, x_defl, r, max_iter, tol),
        }
    }
}
