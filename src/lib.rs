//! txsettle: transaction settlement engine
//!
//! Re-exports the public surface of the workspace crates so applications can
//! depend on a single crate.

pub use txsettle_config as config;
pub use txsettle_engine as engine;
pub use txsettle_executor as executor;
pub use txsettle_ledger as ledger;
pub use txsettle_metrics as metrics;
pub use txsettle_retry as retry;
pub use txsettle_types as types;

pub use txsettle_engine::{
    BroadcastEventSink, EngineError, NetworkConditionMonitor, SettlementEngine,
    SettlementEngineBuilder,
};
pub use txsettle_ledger::{LedgerClient, PayloadFinalizer, RelayClient};
pub use txsettle_types::{
    EngineEvent, EventSink, ExecutionResult, ExecutionStatus, FailureReason, FeeEstimate,
    Priority, StrategyChoice, StrategyKind, TransactionRequest,
};
