//! The user-facing problem description: objective, gradient, optional
//! Hessian, bounds, and whatever extra arguments the callables close over.

use ndarray::{Array1, Array2};

use crate::bounds::Bounds;

type ObjFn<A> = Box<dyn Fn(&Array1<f64>, &A) -> f64 + Send + Sync>;
type GradFn<A> = Box<dyn Fn(&Array1<f64>, &A) -> Array1<f64> + Send + Sync>;
type HessFn<A> = Box<dyn Fn(&Array1<f64>, &A) -> Array2<f64> + Send + Sync>;

/// A problem to search: `f`/`grad` are mandatory, `hess` is optional (a
/// forward-difference approximation of the gradient stands in when it is
/// absent). `args` is forwarded to every callable on every call, exactly
/// as the Python source threads its `args` tuple through `obj_func`.
pub struct Problem<A> {
    pub bounds: Bounds,
    pub f: ObjFn<A>,
    pub grad: GradFn<A>,
    pub hess: Option<HessFn<A>>,
    pub args: A,
}

impl<A> Problem<A> {
    pub fn new(
        bounds: Bounds,
        f: impl Fn(&Array1<f64>, &A) -> f64 + Send + Sync + 'static,
        grad: impl Fn(&Array1<f64>, &A) -> Array1<f64> + Send + Sync + 'static,
        args: A,
    ) -> Self {
        Self {
            bounds,
            f: Box::new(f),
            grad: Box::new(grad),
            hess: None,
            args,
        }
    }

    pub fn with_hessian(mut self, hess: impl Fn(&Array1<f64>, &A) -> Array2<f64> + Send + Sync + 'static) -> Self {
        self.hess = Some(Box::new(hess));
        self
    }

    pub fn dim(&self) -> usize {
        self.bounds.dim()
    }
}
