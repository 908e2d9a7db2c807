//! Error types for the HGDL engine.
//!
//! Mirrors the shape of this codebase's other crate-local error enums
//! (e.g. `autoeq-env`'s `EnvError`): one `thiserror`-derived enum, one
//! variant per failure kind named in the design, propagated with `?`.

use thiserror::Error;

/// Errors raised by the HGDL engine and its caller-facing handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Raised synchronously from `optimize` for malformed inputs: a
    /// dimension mismatch between a supplied start and the problem bounds,
    /// a start outside those bounds, an empty worker pool
    /// (`number_of_walkers == 0`), bounds with `lo >= hi`, or an unknown
    /// local/global method name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A single local search failed: the user callable panicked, the
    /// deflated Newton linear solve failed even after the least-squares
    /// fallback, or the executor dropped the task. Never fatal to the run;
    /// the candidate is simply not merged.
    #[error("worker failed: {0}")]
    WorkerFailure(String),

    /// A handle operation was attempted after `shutdown`, or `get_final`
    /// was called a second time (the coordinator thread can only be
    /// joined once).
    #[error("the engine has already finished and been collected, or was shut down")]
    ExecutorGone,

    /// A snapshot byte buffer failed to decode: bad magic, unsupported
    /// version, or a truncated/corrupt tail.
    #[error("failed to decode snapshot: {0}")]
    Codec(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
