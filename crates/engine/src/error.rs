use thiserror::Error;
use txsettle_ledger::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The cancellation token fired before anything was submitted
    #[error("request cancelled before submission")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing required field: {field}")]
    MissingField { field: String },
}

impl From<txsettle_config::ConfigError> for EngineError {
    fn from(err: txsettle_config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// A monitor tick that produced no new congestion state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("throughput sampling failed: {0}")]
    Sampling(#[from] LedgerError),

    #[error("no usable throughput samples")]
    NoUsableSamples,
}
