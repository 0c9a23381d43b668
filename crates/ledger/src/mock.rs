//! In-memory collaborators for tests
//!
//! Each call pops the next scripted response; once the script is empty the
//! configured fallback answers. Every method counts its calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use txsettle_types::SessionLease;

use crate::{
    Confirmation, LedgerClient, LedgerError, RelayClient, RelayStatus, SubmissionHandle,
    ThroughputSample,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Queue of scripted responses with a sticky fallback
#[derive(Debug)]
pub struct Script<T: Clone> {
    queue: Mutex<VecDeque<T>>,
    fallback: Mutex<T>,
    calls: AtomicU32,
}

impl<T: Clone> Script<T> {
    pub fn new(fallback: T) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicU32::new(0),
        }
    }

    pub fn push(&self, response: T) {
        lock(&self.queue).push_back(response);
    }

    pub fn set_fallback(&self, response: T) {
        *lock(&self.fallback) = response;
    }

    pub fn next(&self) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = lock(&self.queue).pop_front() {
            return response;
        }
        lock(&self.fallback).clone()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Scriptable primary ledger
///
/// Defaults: sends succeed with sequential references, confirmations succeed,
/// the height stays at 100, leases expire at height 250.
#[derive(Debug)]
pub struct MockLedger {
    /// `None` generates a fresh accepted handle
    pub send: Script<Option<Result<SubmissionHandle, LedgerError>>>,
    pub confirm: Script<Result<Confirmation, LedgerError>>,
    /// `None` generates a fresh lease expiring at [`MockLedger::DEFAULT_LEASE_EXPIRY`]
    pub session: Script<Option<Result<SessionLease, LedgerError>>>,
    pub fee_samples: Script<Result<Vec<u64>, LedgerError>>,
    pub height: Script<Result<u64, LedgerError>>,
    pub finalized_height: Script<Result<u64, LedgerError>>,
    pub throughput: Script<Result<Vec<ThroughputSample>, LedgerError>>,
    session_delay: Mutex<Duration>,
    fee_sample_delay: Mutex<Duration>,
    sent_payloads: Mutex<Vec<Vec<u8>>>,
    sequence: AtomicU32,
}

impl MockLedger {
    pub const DEFAULT_HEIGHT: u64 = 100;
    pub const DEFAULT_LEASE_EXPIRY: u64 = 250;

    pub fn new() -> Self {
        Self {
            send: Script::new(None),
            confirm: Script::new(Ok(Confirmation::confirmed())),
            session: Script::new(None),
            fee_samples: Script::new(Ok((1..=100).map(|i| i * 100).collect())),
            height: Script::new(Ok(Self::DEFAULT_HEIGHT)),
            finalized_height: Script::new(Ok(0)),
            throughput: Script::new(Ok(vec![ThroughputSample {
                num_transactions: 1_000,
                num_heights: 150,
                period_ms: 60_000,
            }])),
            session_delay: Mutex::new(Duration::ZERO),
            fee_sample_delay: Mutex::new(Duration::ZERO),
            sent_payloads: Mutex::new(Vec::new()),
            sequence: AtomicU32::new(0),
        }
    }

    /// Delay every session fetch, to hold a fetch in flight
    pub fn set_session_delay(&self, delay: Duration) {
        *lock(&self.session_delay) = delay;
    }

    /// Delay every fee sample request
    pub fn set_fee_sample_delay(&self, delay: Duration) {
        *lock(&self.fee_sample_delay) = delay;
    }

    /// Payloads that reached `send_transaction` and were accepted
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        lock(&self.sent_payloads).clone()
    }

    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn send_transaction(&self, payload: &[u8]) -> Result<SubmissionHandle, LedgerError> {
        let response = self
            .send
            .next()
            .unwrap_or_else(|| Ok(SubmissionHandle::new(format!("tx-{}", self.next_sequence()))));
        if response.is_ok() {
            lock(&self.sent_payloads).push(payload.to_vec());
        }
        response
    }

    async fn confirm(
        &self,
        _handle: &SubmissionHandle,
        _lease: &SessionLease,
    ) -> Result<Confirmation, LedgerError> {
        self.confirm.next()
    }

    async fn get_latest_session(&self) -> Result<SessionLease, LedgerError> {
        let response = self.session.next();
        let delay = *lock(&self.session_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response.unwrap_or_else(|| {
            Ok(SessionLease::new(
                format!("snap-{}", self.next_sequence()),
                Self::DEFAULT_LEASE_EXPIRY,
            ))
        })
    }

    async fn get_recent_fee_samples(&self) -> Result<Vec<u64>, LedgerError> {
        let response = self.fee_samples.next();
        let delay = *lock(&self.fee_sample_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn get_current_height(&self) -> Result<u64, LedgerError> {
        self.height.next()
    }

    async fn get_finalized_height(&self) -> Result<u64, LedgerError> {
        self.finalized_height.next()
    }

    async fn get_recent_throughput_samples(&self) -> Result<Vec<ThroughputSample>, LedgerError> {
        self.throughput.next()
    }
}

/// Scriptable relay or bundle endpoint
///
/// Defaults: submissions succeed with a target height of 101, status reports
/// the transaction landed at that height.
#[derive(Debug)]
pub struct MockRelay {
    name: String,
    /// `None` generates a fresh handle targeting [`MockRelay::DEFAULT_TARGET_HEIGHT`]
    pub submit: Script<Option<Result<SubmissionHandle, LedgerError>>>,
    pub status: Script<Result<RelayStatus, LedgerError>>,
    submitted: Mutex<Vec<(Vec<u8>, u64)>>,
    sequence: AtomicU32,
}

impl MockRelay {
    pub const DEFAULT_TARGET_HEIGHT: u64 = 101;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submit: Script::new(None),
            status: Script::new(Ok(RelayStatus::Landed {
                height: Self::DEFAULT_TARGET_HEIGHT,
            })),
            submitted: Mutex::new(Vec::new()),
            sequence: AtomicU32::new(0),
        }
    }

    /// Payloads and fees accepted by `submit`
    pub fn submitted(&self) -> Vec<(Vec<u8>, u64)> {
        lock(&self.submitted).clone()
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn submit(&self, payload: &[u8], fee: u64) -> Result<SubmissionHandle, LedgerError> {
        let response = self.submit.next().unwrap_or_else(|| {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SubmissionHandle::new(format!("{}-{}", self.name, n))
                .with_target_height(Self::DEFAULT_TARGET_HEIGHT))
        });
        if response.is_ok() {
            lock(&self.submitted).push((payload.to_vec(), fee));
        }
        response
    }

    async fn status(&self, _handle: &SubmissionHandle) -> Result<RelayStatus, LedgerError> {
        self.status.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_pops_then_falls_back() {
        let ledger = MockLedger::new();
        ledger.height.push(Ok(5));
        ledger.height.push(Err(LedgerError::Unavailable("down".into())));

        assert_eq!(ledger.get_current_height().await, Ok(5));
        assert!(ledger.get_current_height().await.is_err());
        assert_eq!(ledger.get_current_height().await, Ok(MockLedger::DEFAULT_HEIGHT));
        assert_eq!(ledger.height.calls(), 3);
    }

    #[tokio::test]
    async fn test_generated_references_are_unique() {
        let ledger = MockLedger::new();
        let a = ledger.send_transaction(b"a").await.unwrap();
        let b = ledger.send_transaction(b"b").await.unwrap();
        assert_ne!(a.reference_id, b.reference_id);
        assert_eq!(ledger.sent_payloads(), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[tokio::test]
    async fn test_failed_send_is_not_recorded() {
        let ledger = MockLedger::new();
        ledger
            .send
            .push(Some(Err(LedgerError::Unavailable("connection refused".into()))));
        assert!(ledger.send_transaction(b"x").await.is_err());
        assert!(ledger.sent_payloads().is_empty());
    }

    #[tokio::test]
    async fn test_relay_defaults() {
        let relay = MockRelay::new("fast-relay");
        let handle = relay.submit(b"tx", 42).await.unwrap();
        assert_eq!(handle.target_height, Some(MockRelay::DEFAULT_TARGET_HEIGHT));
        assert_eq!(relay.submitted(), vec![(b"tx".to_vec(), 42)]);
        assert_eq!(
            relay.status(&handle).await.unwrap(),
            RelayStatus::Landed {
                height: MockRelay::DEFAULT_TARGET_HEIGHT
            }
        );
    }
}
