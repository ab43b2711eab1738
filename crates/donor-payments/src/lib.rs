//! # donor-payments
//!
//! Payment orchestration for the donation checkout: signature-keyed
//! session memoization, single-flight SDK script loading, one adapter
//! per provider, and the orchestrator state machine that ties the draft
//! store and the overlay manager together.
//!
//! ## Session lifecycle
//!
//! ```text
//!  draft change ──▶ signature key ──▶ matches ready session? ──▶ reuse
//!                        │                     │no
//!                        │                     ▼
//!                        │        abort in-flight ▸ create session
//!                        │        (idempotency token) ▸ mount UI
//!                        ▼
//!  stale responses are discarded by generation, never applied
//! ```
//!
//! At most one live session-creation request exists per provider; a
//! newer signature supersedes and aborts the older request. Validation
//! failures never reach the network, and no session is created unless
//! the checkout surface is open.

pub mod adapter;
pub mod api;
pub mod error;
pub mod orchestrator;
pub mod paypal;
pub mod script;
pub mod session;
pub mod signature;
pub mod stripe;
pub mod time;

pub use adapter::{ConfirmOutcome, PrepareOutcome, ProviderAdapter};
pub use api::{CheckoutApi, CheckoutBackend, CreateSessionRequest, CSRF_HEADER};
pub use error::{PaymentError, Result};
pub use orchestrator::{CheckoutOrchestrator, CheckoutPhase, CHECKOUT_SURFACE_ID};
pub use paypal::{PaypalAdapter, WalletButtonsSdk};
pub use script::{ScriptAttrs, ScriptHost, ScriptLoader};
pub use session::{ChargeDraft, PaymentSession, ProviderKind, SessionStatus};
pub use signature::{load_or_create_seed, IdempotencyToken, SignatureKey};
pub use stripe::{CardElementSdk, StripeAdapter, STRIPE_JS_URL};
pub use time::Sleeper;
