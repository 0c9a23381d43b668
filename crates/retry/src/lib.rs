//! Bounded retry for the txsettle settlement engine
//!
//! - `ExponentialBackoff`: capped exponential delay with additive jitter
//! - `RetryPolicy`: attempt budget plus delay shape
//! - `run_with_retry` / `run_with_retry_if`: drive an async operation until it
//!   succeeds, the budget is spent, or an error is classified as permanent
//!
//! Each invocation owns its own backoff state, so concurrent retry chains never
//! interfere with one another.

pub mod backoff;
pub mod retry;

pub use backoff::ExponentialBackoff;
pub use retry::{run_with_retry, run_with_retry_if, LastFailure, RetryError, RetryPolicy};
