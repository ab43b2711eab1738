//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failures crossing the adapter boundary.
///
/// Adapters return these as typed results; nothing here is ever thrown
/// past the orchestrator, which is the single place that decides
/// user-visible wording.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Provider not configured (no public key / client id). The adapter
    /// self-disables; no user-facing error unless the donor tries to
    /// pay with it.
    #[error("configuration missing: {0}")]
    Config(String),

    /// Timeout, abort, or non-2xx without a server message. Retryable
    /// by re-invoking `prepare`.
    #[error("network error: {message}")]
    Network { message: String, timed_out: bool },

    /// Server- or SDK-reported failure. The message is surfaced to the
    /// donor verbatim.
    #[error("{0}")]
    Provider(String),

    /// A response whose signature no longer matches the current draft.
    /// Silently discarded; not a user-visible error.
    #[error("stale response discarded")]
    Stale,
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Network { .. } | PaymentError::Provider(_)
        )
    }

    /// User-facing wording. Provider messages pass through verbatim;
    /// everything else falls back to generic retry text.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Provider(message) => message.clone(),
            PaymentError::Network { timed_out: true, .. } => {
                "The request timed out. Please try again.".into()
            }
            PaymentError::Network { .. } => {
                "Connection problem. Please check your network and try again.".into()
            }
            PaymentError::Config(_) => "This payment method is not available right now.".into(),
            PaymentError::Stale => "Please try again.".into(),
        }
    }
}
