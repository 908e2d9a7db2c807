//! Component F: the epoch engine. Ported in spirit from
//! `original_source/hgdl/hgdl.py`'s `run_hgdl_epoch`/`_run_epochs`: each
//! epoch dispatches `W` local searches against the current deflation set,
//! merges whatever converges back into the store, publishes a snapshot,
//! and reseeds the next epoch's starting points from what's been found so
//! far. Dispatch itself is generalized from the source's Dask client onto
//! this codebase's own pattern (`rayon` behind an [`Executor`] trait, with
//! `catch_unwind` so one walker panicking degrades to a dropped result
//! instead of poisoning the run), matching `src-de`'s "pragmatic,
//! dependency-light" posture rather than pulling in an async runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use parking_lot::RwLock;
use rand::Rng;
use rayon::prelude::*;

use crate::config::HgdlConfig;
use crate::local::LocalResult;
use crate::problem::Problem;
use crate::reseed::reseed;
use crate::store::{OptimaStore, OptimumRecord};

/// Runs a batch of independent local-search tasks to completion. The
/// default is [`RayonExecutor`]; a test or embedding crate can substitute
/// a sequential or instrumented one.
pub trait Executor: Send + Sync {
    /// Runs every task, returning `None` in place of any task that
    /// panicked rather than propagating the panic.
    fn run(&self, tasks: Vec<Box<dyn FnOnce() -> LocalResult + Send>>) -> Vec<Option<LocalResult>>;
}

/// The default executor: a dedicated `rayon` thread pool, one task per
/// walker, panics caught per-task.
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    pub fn new() -> Self {
        Self::with_threads(num_cpus::get())
    }

    pub fn with_threads(n: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n.max(1))
            .build()
            .expect("failed to build the walker thread pool");
        Self { pool }
    }
}

impl Default for RayonExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RayonExecutor {
    fn run(&self, tasks: Vec<Box<dyn FnOnce() -> LocalResult + Send>>) -> Vec<Option<LocalResult>> {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).ok())
                .collect()
        })
    }
}

/// Coordinates the epoch loop against a single [`Problem`]. Owned and
/// driven by the background thread a [`crate::handle::Handle`] spawns;
/// not meant to be used directly by most callers.
pub struct EpochEngine<A> {
    problem: Arc<Problem<A>>,
    config: HgdlConfig<A>,
    executor: Box<dyn Executor>,
    cancel: Arc<AtomicBool>,
    snapshot: Arc<RwLock<Arc<OptimaStore>>>,
}

impl<A: Send + Sync + 'static> EpochEngine<A> {
    pub fn new(
        problem: Problem<A>,
        config: HgdlConfig<A>,
        executor: Box<dyn Executor>,
        cancel: Arc<AtomicBool>,
        snapshot: Arc<RwLock<Arc<OptimaStore>>>,
    ) -> Self {
        Self {
            problem: Arc::new(problem),
            config,
            executor,
            cancel,
            snapshot,
        }
    }

    /// Builds the W-row start matrix from the caller's ordered list of
    /// starts: entries beyond `number_of_walkers` are truncated, entries
    /// missing to reach it are padded with uniform draws from the box.
    fn initial_starts<R: Rng + ?Sized>(&self, starts0: &[Array1<f64>], rng: &mut R) -> Array2<f64> {
        let w = self.config.number_of_walkers;
        let d = self.problem.dim();
        let mut starts = Array2::zeros((w, d));
        for i in 0..w {
            match starts0.get(i) {
                Some(x) => starts.row_mut(i).assign(x),
                None => starts.row_mut(i).assign(&self.problem.bounds.sample_uniform(rng)),
            }
        }
        starts
    }

    /// Runs until `num_epochs` is reached, cancellation is observed, or
    /// (implicitly, via an empty deflation set contract upstream) nothing
    /// new is left to find. Checked only at epoch boundaries, as
    /// specified, not mid-epoch.
    pub fn run(&mut self, starts0: &[Array1<f64>]) -> OptimaStore {
        let mut store = OptimaStore::new(self.config.number_of_optima, self.config.r_merge);
        let mut rng = rand::rng();
        let mut starts = self.initial_starts(starts0, &mut rng);

        for epoch in 0..self.config.num_epochs {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            if self.config.verbose {
                eprintln!("hgdl: epoch {epoch}, {} walkers, {} known optima", starts.nrows(), store.len());
            }

            let x_defl = store.deflation_points();
            let tasks: Vec<Box<dyn FnOnce() -> LocalResult + Send>> = starts
                .rows()
                .into_iter()
                .map(|row| {
                    let x_start = row.to_owned();
                    let problem = self.problem.clone();
                    let method = self.config.local_optimizer.clone();
                    let x_defl = x_defl.clone();
                    let radius = self.config.radius;
                    let max_iter = self.config.local_max_iter;
                    let tol = self.config.tolerance;
                    Box::new(move || method.minimize(&problem, &x_start, &x_defl, radius, max_iter, tol))
                        as Box<dyn FnOnce() -> LocalResult + Send>
                })
                .collect();

            let results = self.executor.run(tasks);
            let records = results.into_iter().flatten().map(OptimumRecord::from_local_result);
            store.merge(records, &self.problem.bounds);

            *self.snapshot.write() = Arc::new(store.clone());

            if self.cancel.load(Ordering::SeqCst) {
                break;
            }

            let x_top = store.deflation_points();
            let f_top: Vec<f64> = store.iter().map(|r| r.f_val).collect();
            starts = reseed(
                &self.config.global_optimizer,
                &x_top,
                &f_top,
                &self.problem.bounds,
                self.config.number_of_walkers,
                &mut rng,
            );
        }

        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds;
    use crate::config::HgdlConfigBuilder;
    use crate::local::LocalMethod;
    use parking_lot::RwLock;

    fn rastrigin_problem() -> Problem<()> {
        let bounds = Bounds::from_pairs(&[(-5.12, 5.12), (-5.12, 5.12)]).unwrap();
        Problem::new(
            bounds,
            |x: &Array1<f64>, _: &()| {
                10.0 * x.len() as f64 + x.iter().map(|&xi| xi * xi - 10.0 * (2.0 * std::f64::consts::PI * xi).cos()).sum::<f64>()
            },
            |x: &Array1<f64>, _: &()| {
                Array1::from_vec(
                    x.iter()
                        .map(|&xi| 2.0 * xi + 20.0 * std::f64::consts::PI * (2.0 * std::f64::consts::PI * xi).sin())
                        .collect(),
                )
            },
            (),
        )
    }

    #[test]
    fn finds_multiple_distinct_minima_on_rastrigin() {
        let problem = rastrigin_problem();
        let config = HgdlConfigBuilder::<()>::new()
            .num_epochs(6)
            .number_of_walkers(24)
            .local_max_iter(25)
            .tolerance(1e-4)
            .local_optimizer(LocalMethod::DNewton)
            .build(&problem.bounds)
            .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(RwLock::new(Arc::new(OptimaStore::new(1, 1.0))));
        let mut engine = EpochEngine::new(problem, config, Box::new(RayonExecutor::with_threads(2)), cancel, snapshot);
        let starts0 = vec![Array1::from_vec(vec![3.0, 3.0])];
        let store = engine.run(&starts0);
        assert!(store.len() >= 2, "Rastrigin in [-5.12, 5.12]^2 has many minima, expected to find more than one");
    }

    #[test]
    fn initial_starts_keeps_the_caller_order_pads_and_truncates() {
        let problem = rastrigin_problem();
        let config = HgdlConfigBuilder::<()>::new().number_of_walkers(4).build(&problem.bounds).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(RwLock::new(Arc::new(OptimaStore::new(1, 1.0))));
        let engine = EpochEngine::new(problem, config, Box::new(RayonExecutor::with_threads(1)), cancel, snapshot);
        let mut rng = rand::rng();

        // Fewer starts than walkers: the caller's starts land in order, the rest are padded.
        let starts0 = vec![Array1::from_vec(vec![1.0, -1.0]), Array1::from_vec(vec![-1.0, 1.0])];
        let starts = engine.initial_starts(&starts0, &mut rng);
        assert_eq!(starts.nrows(), 4);
        assert_eq!(starts.row(0).to_owned(), starts0[0]);
        assert_eq!(starts.row(1).to_owned(), starts0[1]);

        // More starts than walkers: truncated to `number_of_walkers`.
        let many = vec![Array1::from_vec(vec![0.0, 0.0]); 10];
        let starts = engine.initial_starts(&many, &mut rng);
        assert_eq!(starts.nrows(), 4);
    }

    #[test]
    fn cancellation_is_observed_at_an_epoch_boundary() {
        let problem = rastrigin_problem();
        let config = HgdlConfigBuilder::<()>::new()
            .num_epochs(1000)
            .number_of_walkers(8)
            .local_max_iter(5)
            .build(&problem.bounds)
            .unwrap();
        let cancel = Arc::new(AtomicBool::new(true));
        let snapshot = Arc::new(RwLock::new(Arc::new(OptimaStore::new(1, 1.0))));
        let mut engine = EpochEngine::new(problem, config, Box::new(RayonExecutor::with_threads(2)), cancel, snapshot);
        let starts0 = vec![Array1::from_vec(vec![1.0, 1.0])];
        let store = engine.run(&starts0);
        // Cancelled before the first epoch's tasks even get dispatched.
        assert!(store.is_empty());
    }
}
