//! Top-level orchestration for txsettle
//!
//! [`SettlementEngine`] is the entry point. For each request it picks a
//! strategy from live health counters and the congestion snapshot, acquires a
//! session lease, runs the chosen executor (falling back to Standard when a
//! relay is unreachable before submission) and records the result exactly once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use txsettle_engine::SettlementEngine;
//! use txsettle_ledger::mock::MockLedger;
//! use txsettle_types::{Priority, TransactionRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = SettlementEngine::builder()
//!         .with_ledger(Arc::new(MockLedger::new()))
//!         .build()
//!         .unwrap();
//!
//!     let request = TransactionRequest::new(b"payload".to_vec(), Priority::High);
//!     let result = engine.execute(&request).await;
//!     println!("{:?}", result.status());
//! }
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod monitor;
pub mod selector;
pub mod settings;

pub use engine::{SettlementEngine, SettlementEngineBuilder};
pub use error::{EngineError, MonitorError};
pub use events::{BroadcastEventSink, DEFAULT_EVENT_CAPACITY};
pub use monitor::{MonitorConfig, NetworkConditionMonitor};
pub use selector::{
    effective_priority, rank, select, Availability, Selection, SelectionReason, SelectorConfig,
};
