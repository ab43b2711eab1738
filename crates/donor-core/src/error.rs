//! Draft Validation Errors

use thiserror::Error;

/// Validation failures on donor input.
///
/// These never reach the network layer; they surface inline next to the
/// field that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// No amount entered yet
    #[error("Enter a donation amount")]
    AmountMissing,

    /// Input could not be parsed as money
    #[error("Enter a valid amount")]
    AmountInvalid,

    /// Zero or negative amount
    #[error("Amount must be greater than zero")]
    AmountNotPositive,

    /// Below the configured minimum (display string, e.g. "1.00")
    #[error("The minimum donation is {0}")]
    BelowMinimum(String),

    /// Email does not look like an address
    #[error("Enter a valid email address")]
    EmailInvalid,
}

impl DraftError {
    /// Whether this failure should disable the submit control outright
    /// (as opposed to a hint the donor can ignore while typing).
    pub fn blocks_submit(&self) -> bool {
        !matches!(self, DraftError::BelowMinimum(_))
    }
}
