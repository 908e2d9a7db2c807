//! HGDL: Hybrid Global Deflated Local optimization.
//!
//! Finds many stationary points of a differentiable objective — minima,
//! maxima, and saddles — by running many local searches per epoch, each
//! repelled away from points already found via a deflation kernel, and
//! reseeding the next epoch's starting points from the best points found
//! so far. See [`handle::Handle`] for the entry point.

pub mod bounds;
pub mod config;
pub mod constraints;
pub mod deflation;
pub mod engine;
pub mod error;
pub mod handle;
pub mod local;
pub mod problem;
pub mod reseed;
pub mod store;

pub use bounds::Bounds;
pub use config::{HgdlConfig, HgdlConfigBuilder};
pub use constraints::{Constraint, ConstraintKind};
pub use engine::{EpochEngine, Executor, RayonExecutor};
pub use error::{EngineError, Result};
pub use handle::Handle;
pub use local::{LocalMethod, LocalResult};
pub use problem::Problem;
pub use reseed::GlobalMethod;
pub use store::{Classifier, OptimaStore, OptimumRecord};
