//! Submission machinery for the txsettle engine
//!
//! - [`SessionLeaseCache`]: single-flight cache of the ledger session lease
//! - [`FeeEstimator`]: percentile-based priority fees with a fallback table
//! - [`Executor`]: the Standard, Priority-Relay and Bundle-Relay strategies,
//!   sharing one confirmation loop

pub mod confirm;
pub mod error;
pub mod fees;
pub mod lease;
pub mod strategy;

pub use confirm::{poll_confirmation, PollVerdict};
pub use error::ExecutorError;
pub use fees::{compute_from_samples, FeeEstimator, FeeEstimatorConfig};
pub use lease::{LeaseCacheConfig, SessionLeaseCache};
pub use strategy::{
    AttemptOptions, ExecutionContext, ExecutionSettings, ExecutionStage, Executor, NotSubmitted,
};
