//! Page-Supplied Configuration
//!
//! The host page embeds a JSON blob (plus a CSRF meta tag) that tells the
//! engine where the server lives, which providers are enabled, and how
//! amounts are bounded. Nothing here is fetched at boot; a missing
//! provider key simply disables that provider.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A sub-entity donations can be attributed to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntry {
    pub id: String,
    pub label: String,
}

/// Processor fee schedule used for the fee-cover gross-up.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Percentage as a fraction, e.g. `0.029` for 2.9%
    pub percent: Decimal,

    /// Fixed per-transaction fee in cents
    pub fixed_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            percent: Decimal::new(29, 3), // 2.9%
            fixed_cents: 30,
        }
    }
}

/// Everything the checkout engine needs from the host page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Base URL for the session-creation endpoints, e.g. `""` (same origin)
    #[serde(default)]
    pub api_base: String,

    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// BCP 47 locale tag
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Smallest billable donation in cents
    #[serde(default = "default_minimum")]
    pub minimum_cents: i64,

    /// Upper clamp for donor input in cents
    #[serde(default = "default_ceiling")]
    pub ceiling_cents: i64,

    /// Round-up target denomination in cents (0 disables round-up)
    #[serde(default = "default_round_up")]
    pub round_up_denomination_cents: i64,

    #[serde(default)]
    pub fee: FeeSchedule,

    /// Stripe publishable key; `None` disables the card provider
    #[serde(default)]
    pub stripe_public_key: Option<String>,

    /// PayPal client id; `None` disables the wallet provider
    #[serde(default)]
    pub paypal_client_id: Option<String>,

    /// CSRF token attached as a header on all mutating requests
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// CSP nonce propagated onto dynamically injected script tags
    #[serde(default)]
    pub script_nonce: Option<String>,

    /// Post-payment return URL handed to the card provider's confirm call
    #[serde(default = "default_return_url")]
    pub return_url: String,

    /// UI theme name; part of the session signature because it affects
    /// the mounted provider element
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Whether a syntactically valid donor email gates session creation
    #[serde(default = "default_require_email")]
    pub require_email: bool,

    /// Teams offered for attribution
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
}

fn default_currency() -> String {
    "USD".into()
}

fn default_locale() -> String {
    "en-US".into()
}

fn default_minimum() -> i64 {
    100
}

fn default_ceiling() -> i64 {
    999_999_99
}

fn default_round_up() -> i64 {
    100
}

fn default_return_url() -> String {
    "/donate/thanks".into()
}

fn default_theme() -> String {
    "light".into()
}

fn default_require_email() -> bool {
    true
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            currency: default_currency(),
            locale: default_locale(),
            minimum_cents: default_minimum(),
            ceiling_cents: default_ceiling(),
            round_up_denomination_cents: default_round_up(),
            fee: FeeSchedule::default(),
            stripe_public_key: None,
            paypal_client_id: None,
            csrf_token: None,
            script_nonce: None,
            return_url: default_return_url(),
            theme: default_theme(),
            require_email: default_require_email(),
            teams: Vec::new(),
        }
    }
}

impl CheckoutConfig {
    /// Parse the page-embedded JSON blob.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(raw)?;
        if config.stripe_public_key.is_none() && config.paypal_client_id.is_none() {
            tracing::warn!("no provider keys configured; checkout will be disabled");
        }
        Ok(config)
    }
}
