//! Payment Sessions
//!
//! One live session per provider at most. A session with `Ready` status
//! whose signature still matches the draft is reused verbatim; anything
//! else is superseded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use donor_core::{DonationDraft, DraftSummary};

use crate::signature::SignatureKey;

/// The two interchangeable payment providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Card element provider (embedded payment element)
    Stripe,
    /// Redirect/wallet provider (buttons + capture)
    Paypal,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Stripe => "stripe",
            ProviderKind::Paypal => "paypal",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    None,
    Preparing,
    Ready,
    Confirming,
    Succeeded,
    Failed,
}

/// A provider-side payment session created through the server boundary.
#[derive(Clone, Debug)]
pub struct PaymentSession {
    pub provider: ProviderKind,
    pub signature: SignatureKey,
    /// `client_secret` (card) or order id (wallet)
    pub credential: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn preparing(provider: ProviderKind, signature: SignatureKey) -> Self {
        Self {
            provider,
            signature,
            credential: String::new(),
            status: SessionStatus::Preparing,
            created_at: Utc::now(),
        }
    }

    pub fn ready(provider: ProviderKind, signature: SignatureKey, credential: String) -> Self {
        Self {
            provider,
            signature,
            credential,
            status: SessionStatus::Ready,
            created_at: Utc::now(),
        }
    }

    /// Reusable without a new network call for this signature.
    pub fn matches(&self, signature: &SignatureKey) -> bool {
        self.status == SessionStatus::Ready && self.signature == *signature
    }
}

/// The slice of the draft that affects server-side pricing/identity,
/// assembled by the orchestrator from the store's snapshot and summary.
/// `amount_cents` is the billed total (base + round-up + fee cover).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargeDraft {
    pub amount_cents: i64,
    pub currency: String,
    pub donor_email: String,
    pub donor_name: String,
    pub team_id: Option<String>,
    pub theme: String,
}

impl ChargeDraft {
    pub fn assemble(draft: &DonationDraft, summary: &DraftSummary, theme: &str) -> Self {
        Self {
            amount_cents: summary.total_cents,
            currency: draft.currency.clone(),
            donor_email: draft.donor_email.clone(),
            donor_name: if draft.anonymous {
                String::new()
            } else {
                draft.donor_name.clone()
            },
            team_id: draft.team_id.clone(),
            theme: theme.into(),
        }
    }
}
