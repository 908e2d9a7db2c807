//! Component G: the caller-facing, non-blocking handle. Ported in spirit
//! from `original_source/hgdl/hgdl.py`'s `HGDL` class (`optimize`,
//! `get_latest`, `get_final`, `cancel_tasks`, `kill`), which hands the
//! epoch loop off to a Dask client; here it's one `std::thread` running
//! the [`EpochEngine`], matching `src-de`'s dependency-light posture
//! rather than pulling in an async runtime for a single background task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ndarray::Array1;
use parking_lot::{Mutex, RwLock};

use crate::config::HgdlConfig;
use crate::engine::{EpochEngine, Executor, RayonExecutor};
use crate::error::{EngineError, Result};
use crate::problem::Problem;
use crate::store::OptimaStore;

/// A running (or finished) HGDL search. `optimize` returns immediately;
/// the epoch loop runs on its own thread until it finishes, is cancelled,
/// or the handle is dropped.
pub struct Handle {
    cancel: Arc<AtomicBool>,
    snapshot: Arc<RwLock<Arc<OptimaStore>>>,
    coordinator: Mutex<Option<JoinHandle<OptimaStore>>>,
}

impl Handle {
    /// Spawns the coordinator thread and returns immediately. `starts` is
    /// the ordered sequence of walker starting points (spec §3/§4.F):
    /// padded with uniform draws from the box up to `number_of_walkers`
    /// if shorter, truncated to that length if longer. Validates every
    /// entry synchronously: a dimension mismatch or an out-of-box point
    /// is an [`EngineError::InvalidArgument`], not a background failure.
    pub fn optimize<A: Send + Sync + 'static>(problem: Problem<A>, config: HgdlConfig<A>, starts: Vec<Array1<f64>>) -> Result<Self> {
        for (i, x) in starts.iter().enumerate() {
            if x.len() != problem.dim() {
                return Err(EngineError::InvalidArgument(format!(
                    "start {i} has {} entries, problem has {} dimensions",
                    x.len(),
                    problem.dim()
                )));
            }
            if !problem.bounds.in_box(x) {
                return Err(EngineError::InvalidArgument(format!("start {i} lies outside the problem bounds")));
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(RwLock::new(Arc::new(OptimaStore::new(config.number_of_optima, config.r_merge))));
        let cancel_for_engine = cancel.clone();
        let snapshot_for_engine = snapshot.clone();
        let executor: Box<dyn Executor> = Box::new(RayonExecutor::new());

        let coordinator = std::thread::spawn(move || {
            let mut engine = EpochEngine::new(problem, config, executor, cancel_for_engine, snapshot_for_engine);
            engine.run(&starts)
        });

        Ok(Self {
            cancel,
            snapshot,
            coordinator: Mutex::new(Some(coordinator)),
        })
    }

    /// The most recently published snapshot; cheap, lock-free after the
    /// `Arc` clone, and safe to call at any time, including after
    /// [`Self::get_final`].
    pub fn get_latest(&self) -> Arc<OptimaStore> {
        self.snapshot.read().clone()
    }

    /// Requests cancellation. Observed at the next epoch boundary, not
    /// mid-epoch; does not block.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Blocks until the coordinator thread finishes and returns its final
    /// store. Can only succeed once: a second call returns
    /// [`EngineError::ExecutorGone`], since the underlying
    /// `std::thread::JoinHandle` can only be joined once.
    pub fn get_final(&self) -> Result<OptimaStore> {
        let mut guard = self.coordinator.lock();
        match guard.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| EngineError::WorkerFailure("the coordinator thread panicked".into())),
            None => Err(EngineError::ExecutorGone),
        }
    }

    /// Cancels and blocks until the coordinator thread has actually
    /// stopped. Idempotent: calling it again after the first time returns
    /// cleanly rather than erroring, unlike a raw `get_final`.
    pub fn shutdown(&self) {
        self.cancel();
        let _ = self.get_final();
    }
}
