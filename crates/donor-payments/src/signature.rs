//! Signature Keys & Idempotency Tokens
//!
//! The signature key is a deterministic fingerprint of every field that
//! affects server-side pricing or identity. Identical input always
//! produces an identical key, which is what lets `prepare` skip the
//! network on every keystroke that doesn't change the charge.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use donor_core::KeyValueStorage;

use crate::session::ProviderKind;

/// Volatile storage key for the per-browser idempotency seed.
pub const SEED_STORAGE_KEY: &str = "donorkit.seed";

/// Fields that feed the signature, borrowed from the charge draft.
#[derive(Clone, Copy, Debug)]
pub struct SignatureInput<'a> {
    pub amount_cents: i64,
    pub currency: &'a str,
    pub team_id: Option<&'a str>,
    pub donor_email: &'a str,
    pub theme: &'a str,
    pub provider: ProviderKind,
}

/// Deterministic fingerprint of a [`SignatureInput`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureKey(String);

impl SignatureKey {
    pub fn compute(input: &SignatureInput<'_>) -> Self {
        let canonical = format!(
            "v1|amount={}|currency={}|team={}|email={}|theme={}|provider={}",
            input.amount_cents,
            input.currency,
            input.team_id.unwrap_or(""),
            input.donor_email,
            input.theme,
            input.provider,
        );
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // short prefix is enough for logs
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Opaque token letting the server collapse retried session-creation
/// requests into one underlying charge attempt.
///
/// Derived from the stable per-browser seed and the signature key: the
/// same attempt retried reuses the same token, while any input change
/// produces a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    pub fn derive(seed: &str, signature: &SignatureKey) -> Self {
        let digest = Sha256::digest(format!("{seed}:{}", signature.as_str()).as_bytes());
        Self(hex::encode(&digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Load the per-browser seed from volatile storage, minting one on
/// first use. Survives same-tab navigation, not reopened tabs.
pub fn load_or_create_seed(volatile: &dyn KeyValueStorage) -> String {
    if let Some(seed) = volatile.get(SEED_STORAGE_KEY) {
        if !seed.is_empty() {
            return seed;
        }
    }
    let seed = Uuid::new_v4().to_string();
    volatile.set(SEED_STORAGE_KEY, &seed);
    seed
}
