//! Provider Adapter Contract
//!
//! One adapter per external payment SDK/service. Adapters return tagged
//! outcomes instead of throwing, so the orchestrator never branches on
//! callback identity or exception types.

use async_trait::async_trait;

use crate::error::PaymentError;
use crate::session::{ChargeDraft, ProviderKind, SessionStatus};

/// Result of `prepare`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// A session matching the current signature is mounted and usable.
    Ready,
    /// The adapter has no configuration and silently self-disabled.
    Unavailable,
    /// This call was superseded by a newer signature (or a teardown);
    /// the caller ignores it without surfacing anything.
    Superseded,
    /// Typed failure; retryable by re-invoking `prepare`.
    Failed(PaymentError),
}

/// Result of `confirm`. Only a small set of provider statuses is
/// terminal-success; anything ambiguous is a failure, never silently a
/// success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Succeeded,
    /// Provider reported the payment as in-flight (`processing` /
    /// `PENDING`); treated as success-pending.
    Pending,
    /// `message` is the provider-supplied text, surfaced verbatim when
    /// present.
    Failed { message: Option<String> },
}

/// Integration boundary to one payment provider.
#[async_trait(?Send)]
pub trait ProviderAdapter {
    fn kind(&self) -> ProviderKind;

    /// Whether this provider has the configuration it needs. A missing
    /// key disables the adapter without error.
    fn available(&self) -> bool;

    /// Speculatively warm the SDK script cache. Must never create a
    /// payment session or mount UI.
    async fn prewarm(&self);

    /// Ensure a mounted session matching `draft`. Memoized on the
    /// signature key unless `force` is set; supersedes and aborts any
    /// in-flight request for this provider.
    async fn prepare(&self, draft: &ChargeDraft, force: bool) -> PrepareOutcome;

    /// Unmount UI, abort in-flight work, drop the session. Safe to call
    /// even if never prepared.
    fn teardown(&self);

    /// Confirm the prepared session. The session survives a failure and
    /// remains retryable while still valid.
    async fn confirm(&self, draft: &ChargeDraft) -> ConfirmOutcome;

    /// Current session status, for diagnostics and UI affordances.
    fn session_status(&self) -> SessionStatus;
}
