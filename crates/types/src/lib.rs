//! Core types for the txsettle transaction settlement engine
//!
//! Requests, leases, fee estimates, results, congestion snapshots, strategy
//! health counters and the event envelope shared by every other crate.

pub mod congestion;
pub mod event;
pub mod fee;
pub mod lease;
pub mod priority;
pub mod request;
pub mod result;
pub mod stats;
pub mod strategy;

pub use congestion::*;
pub use event::*;
pub use fee::*;
pub use lease::*;
pub use priority::*;
pub use request::*;
pub use result::*;
pub use stats::*;
pub use strategy::*;
