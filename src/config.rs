//! Configuration, builder-shaped the way `src-de/src/mod.rs`'s
//! `DEConfig`/`DEConfigBuilder` is: a plain data struct plus a builder
//! that fills in spec-mandated defaults and resolves the ones that
//! depend on the problem (the deflation radius) at `build()` time.

use crate::bounds::Bounds;
use crate::error::{EngineError, Result};
use crate::local::LocalMethod;
use crate::reseed::GlobalMethod;

/// Resolved engine configuration. Build one with [`HgdlConfigBuilder`].
pub struct HgdlConfig<A> {
    pub num_epochs: usize,
    pub number_of_walkers: usize,
    pub local_optimizer: LocalMethod<A>,
    pub global_optimizer: GlobalMethod,
    pub number_of_optima: usize,
    pub radius: f64,
    pub r_merge: f64,
    pub local_max_iter: usize,
    pub tolerance: f64,
    pub verbose: bool,
}

/// Builder for [`HgdlConfig`]. Carries the source's `number_of_walkers=20`
/// default (see `DESIGN.md` Open Question 1) but otherwise follows the
/// spec-mandated defaults (`local_max_iter=100`, `tolerance=1e-6`,
/// `number_of_optima=1_000_000`, `local_optimizer="L-BFGS-B"`), with the
/// radius left unresolved (`None`) until `build`, where it is derived as
/// `min(hi - lo) / 1000` over the problem's bounds if the caller never
/// set one explicitly.
pub struct HgdlConfigBuilder<A> {
    num_epochs: usize,
    number_of_walkers: usize,
    local_optimizer: LocalMethod<A>,
    global_optimizer: GlobalMethod,
    number_of_optima: usize,
    radius: Option<f64>,
    r_merge: Option<f64>,
    local_max_iter: usize,
    tolerance: f64,
    verbose: bool,
}

impl<A> Default for HgdlConfigBuilder<A> {
    fn default() -> Self {
        Self {
            num_epochs: 100_000,
            number_of_walkers: 20,
            local_optimizer: LocalMethod::LBfgsB,
            global_optimizer: GlobalMethod::Genetic,
            number_of_optima: 1_000_000,
            radius: None,
            r_merge: None,
            local_max_iter: 100,
            tolerance: 1e-6,
            verbose: false,
        }
    }
}

impl<A> HgdlConfigBuilder<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_epochs(mut self, n: usize) -> Self {
        self.num_epochs = n;
        self
    }

    pub fn number_of_walkers(mut self, w: usize) -> Self {
        self.number_of_walkers = w;
        self
    }

    pub fn local_optimizer(mut self, method: LocalMethod<A>) -> Self {
        self.local_optimizer = method;
        self
    }

    pub fn global_optimizer(mut self, method: GlobalMethod) -> Self {
        self.global_optimizer = method;
        self
    }

    pub fn number_of_optima(mut self, n: usize) -> Self {
        self.number_of_optima = n;
        self
    }

    pub fn radius(mut self, r: f64) -> Self {
        self.radius = Some(r);
        self
    }

    pub fn r_merge(mut self, r: f64) -> Self {
        self.r_merge = Some(r);
        self
    }

    pub fn local_max_iter(mut self, n: usize) -> Self {
        self.local_max_iter = n;
        self
    }

    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    /// Validates the configuration against `bounds` and resolves the
    /// radius/merge-distance defaults.
    pub fn build(self, bounds: &Bounds) -> Result<HgdlConfig<A>> {
        if self.number_of_walkers == 0 {
            return Err(EngineError::InvalidArgument("number_of_walkers must be at least 1".into()));
        }
        if self.num_epochs == 0 {
            return Err(EngineError::InvalidArgument("num_epochs must be at least 1".into()));
        }
        if self.local_optimizer.requires_nlopt() && !cfg!(feature = "nlopt") {
            return Err(EngineError::InvalidArgument(
                "this local method requires the 'nlopt' feature, which is disabled".into(),
            ));
        }
        let radius = self.radius.unwrap_or_else(|| bounds.min_span() / 1000.0);
        if radius <= 0.0 {
            return Err(EngineError::InvalidArgument(format!("resolved deflation radius must be positive, got {radius}")));
        }
        let r_merge = self.r_merge.unwrap_or(radius);

        Ok(HgdlConfig {
            num_epochs: self.num_epochs,
            number_of_walkers: self.number_of_walkers,
            local_optimizer: self.local_optimizer,
            global_optimizer: self.global_optimizer,
            number_of_optima: self.number_of_optima,
            radius,
            r_merge,
            local_max_iter: self.local_max_iter,
            tolerance: self.tolerance,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_auto_derives_from_bounds_when_unset() {
        let bounds = Bounds::from_pairs(&[(0.0, 2.0), (0.0, 10.0)]).unwrap();
        let cfg: HgdlConfig<()> = HgdlConfigBuilder::new().build(&bounds).unwrap();
        assert!((cfg.radius - 2.0 / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_radius_is_respected() {
        let bounds = Bounds::from_pairs(&[(0.0, 2.0)]).unwrap();
        let cfg: HgdlConfig<()> = HgdlConfigBuilder::new().radius(0.25).build(&bounds).unwrap();
        assert_eq!(cfg.radius, 0.25);
    }

    #[test]
    fn zero_walkers_is_rejected() {
        let bounds = Bounds::from_pairs(&[(0.0, 1.0)]).unwrap();
        let result: Result<HgdlConfig<()>> = HgdlConfigBuilder::new().number_of_walkers(0).build(&bounds);
        assert!(result.is_err());
    }
}
