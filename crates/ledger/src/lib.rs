//! External collaborators of the txsettle engine
//!
//! - `LedgerClient`: the primary ledger endpoint (submission, confirmation,
//!   session leases, fee and throughput samples)
//! - `RelayClient`: alternate submission channels with their own status endpoint
//! - `PayloadFinalizer`: builds the submitted bytes once fee and lease are known
//!
//! The [`mock`] module provides scriptable in-memory implementations.

pub mod client;
pub mod error;
pub mod finalizer;
pub mod mock;
pub mod relay;

pub use client::{Confirmation, LedgerClient, SubmissionHandle, ThroughputSample};
pub use error::LedgerError;
pub use finalizer::{PassthroughFinalizer, PayloadFinalizer};
pub use relay::{RelayClient, RelayStatus};
