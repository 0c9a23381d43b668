use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use txsettle_ledger::{
    LedgerClient, LedgerError, PayloadFinalizer, RelayClient, RelayStatus, SubmissionHandle,
};
use txsettle_retry::{run_with_retry_if, RetryError, RetryPolicy};
use txsettle_types::{ExecutionResult, SessionLease, StrategyKind, TransactionRequest};

use crate::confirm::{poll_confirmation, poll_error, PollVerdict};
use crate::{ExecutorError, FeeEstimator};

/// Stages a request moves through, used as the `stage` log field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Created,
    LeaseAcquired,
    Submitted,
    Confirmed,
    Failed,
    Recorded,
}

impl ExecutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStage::Created => "created",
            ExecutionStage::LeaseAcquired => "lease_acquired",
            ExecutionStage::Submitted => "submitted",
            ExecutionStage::Confirmed => "confirmed",
            ExecutionStage::Failed => "failed",
            ExecutionStage::Recorded => "recorded",
        }
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeouts and retry budgets shared by every strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    /// Confirmation polling budget
    pub poll: RetryPolicy,
    /// Polling budget for requests the selector had to escalate
    pub escalated_poll: RetryPolicy,
    /// Primary endpoint sends while nothing has left the process
    pub submit: RetryPolicy,
    pub confirmation_timeout: Duration,
    pub submit_timeout: Duration,
    /// Accept a finalized relay target height as confirmation when the relay
    /// status endpoint is unreachable
    pub optimistic_relay_confirmation: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        let poll = RetryPolicy::new(8, Duration::from_millis(250), Duration::from_secs(4));
        Self {
            escalated_poll: poll.clone().with_max_attempts(15),
            submit: RetryPolicy::new(3, Duration::from_millis(250), Duration::from_secs(4)),
            poll,
            confirmation_timeout: Duration::from_secs(30),
            submit_timeout: Duration::from_secs(10),
            optimistic_relay_confirmation: false,
        }
    }
}

/// Collaborators every strategy needs
#[derive(Clone)]
pub struct ExecutionContext {
    pub ledger: Arc<dyn LedgerClient>,
    pub fees: Arc<FeeEstimator>,
    pub finalizer: Arc<dyn PayloadFinalizer>,
    pub settings: ExecutionSettings,
}

/// Per-attempt switches decided by the caller
#[derive(Debug, Clone, Default)]
pub struct AttemptOptions {
    /// Use the escalated polling budget
    pub escalated: bool,
    /// Checked right before submission; ignored afterwards
    pub cancel: Option<CancellationToken>,
}

/// Why an execution ended without anything leaving the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotSubmitted {
    /// The channel could not be reached; another strategy may try
    Unsent(ExecutorError),
    Cancelled,
}

enum Submission {
    Submitted(SubmissionHandle),
    Unsent(ExecutorError),
    /// The request may have left the process; its fate is unknown
    Indeterminate(String),
    Refused(String),
}

/// One of the three submission strategies
#[derive(Clone)]
pub enum Executor {
    /// Submit to the primary ledger endpoint and poll it
    Standard,
    /// Submit through a low-latency relay, confirming via its status endpoint
    PriorityRelay(Arc<dyn RelayClient>),
    /// Submit through a bundling endpoint, confirming against it and the ledger
    BundleRelay(Arc<dyn RelayClient>),
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executor::Standard => f.write_str("Standard"),
            Executor::PriorityRelay(relay) => write!(f, "PriorityRelay({})", relay.endpoint()),
            Executor::BundleRelay(relay) => write!(f, "BundleRelay({})", relay.endpoint()),
        }
    }
}

impl Executor {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Executor::Standard => StrategyKind::Standard,
            Executor::PriorityRelay(_) => StrategyKind::PriorityRelay,
            Executor::BundleRelay(_) => StrategyKind::BundleRelay,
        }
    }

    /// Submit and wait for confirmation, always producing a result
    pub async fn submit_and_confirm(
        &self,
        ctx: &ExecutionContext,
        request: &TransactionRequest,
        lease: &SessionLease,
    ) -> ExecutionResult {
        match self
            .execute(ctx, request, lease, &AttemptOptions::default())
            .await
        {
            Ok(result) => result,
            Err(NotSubmitted::Unsent(err)) => {
                ExecutionResult::failed(request.id(), self.kind(), err.failure_reason())
            }
            Err(NotSubmitted::Cancelled) => ExecutionResult::failed(
                request.id(),
                self.kind(),
                ExecutorError::Rejected("cancelled before submission".to_string()).failure_reason(),
            ),
        }
    }

    /// Fee, finalize, submit, confirm
    ///
    /// `Err` means nothing left the process, either because the channel was
    /// unreachable or because `options.cancel` fired first.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &TransactionRequest,
        lease: &SessionLease,
        options: &AttemptOptions,
    ) -> Result<ExecutionResult, NotSubmitted> {
        let kind = self.kind();
        let fee = ctx.fees.estimate(request.priority()).await;

        let finalized = tokio::time::timeout(
            ctx.settings.submit_timeout,
            ctx.finalizer.finalize(request.payload(), fee, lease),
        )
        .await;

        let payload = match finalized {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!(
                    request_id = request.id(),
                    error_type = "finalize",
                    error = %e,
                    "payload finalization failed"
                );
                return Ok(ExecutionResult::failed(
                    request.id(),
                    kind,
                    ExecutorError::Rejected(format!("payload finalization failed: {e}"))
                        .failure_reason(),
                ));
            }
            Err(_) => {
                let timeout_ms = ctx.settings.submit_timeout.as_millis() as u64;
                warn!(
                    request_id = request.id(),
                    error_type = "finalize",
                    timeout_ms,
                    "payload finalization timed out"
                );
                return Ok(ExecutionResult::failed(
                    request.id(),
                    kind,
                    ExecutorError::Rejected(format!(
                        "payload finalization timed out after {timeout_ms}ms"
                    ))
                    .failure_reason(),
                ));
            }
        };

        if options
            .cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
        {
            debug!(request_id = request.id(), "cancelled before submission");
            return Err(NotSubmitted::Cancelled);
        }

        let started = Instant::now();
        let handle = match self.submit(ctx, &payload, fee).await {
            Submission::Submitted(handle) => handle,
            Submission::Unsent(err) => return Err(NotSubmitted::Unsent(err)),
            Submission::Indeterminate(detail) => {
                warn!(
                    request_id = request.id(),
                    strategy = kind.name(),
                    detail = %detail,
                    "submission outcome unknown"
                );
                return Ok(ExecutionResult::failed(
                    request.id(),
                    kind,
                    ExecutorError::Timeout.failure_reason(),
                ));
            }
            Submission::Refused(reason) => {
                return Ok(ExecutionResult::failed(
                    request.id(),
                    kind,
                    ExecutorError::Rejected(reason).failure_reason(),
                ));
            }
        };

        info!(
            request_id = request.id(),
            strategy = kind.name(),
            reference_id = %handle.reference_id,
            fee,
            stage = %ExecutionStage::Submitted,
            "transaction submitted"
        );

        let policy = if options.escalated {
            &ctx.settings.escalated_poll
        } else {
            &ctx.settings.poll
        };
        let polls = AtomicU32::new(0);
        let handle = &handle;
        let confirmation = poll_confirmation(
            ctx.ledger.as_ref(),
            lease,
            policy,
            ctx.settings.confirmation_timeout,
            &polls,
            move || self.check(ctx, handle, lease),
        )
        .await;
        let polls = polls.load(Ordering::SeqCst);

        let result = match confirmation {
            Ok(optimistic) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                ExecutionResult::confirmed(
                    request.id(),
                    kind,
                    handle.reference_id.clone(),
                    latency_ms,
                    polls,
                )
                .with_optimistic(optimistic)
            }
            Err(err) => ExecutionResult::unconfirmed(
                request.id(),
                kind,
                handle.reference_id.clone(),
                err.failure_reason(),
                polls,
            ),
        };

        let stage = if result.confirmed {
            ExecutionStage::Confirmed
        } else {
            ExecutionStage::Failed
        };
        info!(
            request_id = request.id(),
            strategy = kind.name(),
            stage = %stage,
            polls,
            latency_ms = result.confirmation_latency_ms,
            failure = result.failure_reason.as_ref().map(|r| r.as_str()),
            "confirmation finished"
        );
        Ok(result)
    }

    async fn submit(&self, ctx: &ExecutionContext, payload: &[u8], fee: u64) -> Submission {
        let timeout = ctx.settings.submit_timeout;
        match self {
            Executor::Standard => {
                let ledger = ctx.ledger.as_ref();
                let sent = run_with_retry_if(
                    "send_transaction",
                    &ctx.settings.submit,
                    move |_| async move {
                        tokio::time::timeout(timeout, ledger.send_transaction(payload))
                            .await
                            .unwrap_or_else(|_| Err(LedgerError::Timeout("send timed out".into())))
                    },
                    |_| true,
                    |e| matches!(e, LedgerError::Unavailable(_)),
                )
                .await;

                match sent {
                    Ok(handle) => Submission::Submitted(handle),
                    Err(RetryError::Exhausted { attempts, last }) => {
                        Submission::Unsent(ExecutorError::RetryExhausted(format!(
                            "send failed after {attempts} attempts: {last}"
                        )))
                    }
                    Err(RetryError::Aborted { error, .. }) => classify_send_error(error),
                }
            }
            Executor::PriorityRelay(relay) | Executor::BundleRelay(relay) => {
                let sent = tokio::time::timeout(timeout, relay.submit(payload, fee))
                    .await
                    .unwrap_or_else(|_| Err(LedgerError::Timeout("relay submit timed out".into())));

                match sent {
                    Ok(handle) => Submission::Submitted(handle),
                    Err(error) => {
                        debug!(endpoint = relay.endpoint(), error = %error, "relay submission failed");
                        classify_send_error(error)
                    }
                }
            }
        }
    }

    async fn check(
        &self,
        ctx: &ExecutionContext,
        handle: &SubmissionHandle,
        lease: &SessionLease,
    ) -> Result<PollVerdict, ExecutorError> {
        match self {
            Executor::Standard => confirm_on_ledger(ctx, handle, lease).await,
            Executor::PriorityRelay(relay) => match relay.status(handle).await {
                Ok(status) => Ok(relay_verdict(status)),
                Err(e) => {
                    debug!(
                        endpoint = relay.endpoint(),
                        error = %e,
                        "relay status unreachable, checking ledger"
                    );
                    if ctx.settings.optimistic_relay_confirmation
                        && target_finalized(ctx, handle).await
                    {
                        return Ok(PollVerdict::Confirmed { optimistic: true });
                    }
                    confirm_on_ledger(ctx, handle, lease).await
                }
            },
            Executor::BundleRelay(relay) => {
                match relay.status(handle).await {
                    Ok(RelayStatus::Pending) => {}
                    Ok(status) => return Ok(relay_verdict(status)),
                    Err(e) => {
                        debug!(endpoint = relay.endpoint(), error = %e, "bundle status unreachable")
                    }
                }
                confirm_on_ledger(ctx, handle, lease).await
            }
        }
    }
}

fn classify_send_error(error: LedgerError) -> Submission {
    match error {
        LedgerError::Unavailable(msg) => Submission::Unsent(ExecutorError::LedgerUnavailable(msg)),
        LedgerError::Rejected(reason) => Submission::Refused(reason),
        other @ (LedgerError::Timeout(_) | LedgerError::InvalidResponse(_)) => {
            Submission::Indeterminate(other.to_string())
        }
    }
}

fn relay_verdict(status: RelayStatus) -> PollVerdict {
    match status {
        RelayStatus::Landed { .. } => PollVerdict::Confirmed { optimistic: false },
        RelayStatus::Pending => PollVerdict::Pending,
        RelayStatus::Failed { reason } => PollVerdict::Rejected(reason),
    }
}

async fn confirm_on_ledger(
    ctx: &ExecutionContext,
    handle: &SubmissionHandle,
    lease: &SessionLease,
) -> Result<PollVerdict, ExecutorError> {
    ctx.ledger
        .confirm(handle, lease)
        .await
        .map(PollVerdict::from_confirmation)
        .map_err(poll_error)
}

async fn target_finalized(ctx: &ExecutionContext, handle: &SubmissionHandle) -> bool {
    let Some(target) = handle.target_height else {
        return false;
    };
    match ctx.ledger.get_finalized_height().await {
        Ok(finalized) => target <= finalized,
        Err(_) => false,
    }
}
