//! Stripe Card Element Adapter
//!
//! Lazy-loads Stripe.js exactly once, creates a payment intent through
//! the server boundary, and mounts the Payment Element. The browser SDK
//! surface sits behind [`CardElementSdk`] so the whole flow tests
//! natively.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::{AbortHandle, Abortable, Aborted};

use donor_core::CheckoutConfig;

use crate::adapter::{ConfirmOutcome, PrepareOutcome, ProviderAdapter};
use crate::api::{CheckoutBackend, CreateSessionRequest};
use crate::error::PaymentError;
use crate::script::{ScriptAttrs, ScriptLoader};
use crate::session::{ChargeDraft, PaymentSession, ProviderKind, SessionStatus};
use crate::signature::{IdempotencyToken, SignatureInput, SignatureKey};

pub const STRIPE_JS_URL: &str = "https://js.stripe.com/v3/";

/// The slice of Stripe.js this adapter needs.
#[async_trait(?Send)]
pub trait CardElementSdk {
    /// Mount the payment element for `client_secret` into the designated
    /// container. Implementations replace any previously mounted element.
    async fn mount(
        &self,
        public_key: &str,
        client_secret: &str,
        theme: &str,
    ) -> Result<(), PaymentError>;

    fn unmount(&self);

    /// Run the provider confirmation with the fixed post-payment return
    /// URL; resolves to the provider's status word.
    async fn confirm(&self, return_url: &str) -> Result<String, PaymentError>;
}

pub struct StripeAdapter {
    config: Rc<CheckoutConfig>,
    backend: Rc<dyn CheckoutBackend>,
    scripts: Rc<ScriptLoader>,
    sdk: Rc<dyn CardElementSdk>,
    /// Per-browser idempotency seed
    seed: String,
    /// Bumped on every supersede/teardown; awaits compare against it
    /// before applying their results
    generation: Cell<u64>,
    inflight: RefCell<Option<AbortHandle>>,
    session: RefCell<Option<PaymentSession>>,
}

impl StripeAdapter {
    pub fn new(
        config: Rc<CheckoutConfig>,
        backend: Rc<dyn CheckoutBackend>,
        scripts: Rc<ScriptLoader>,
        sdk: Rc<dyn CardElementSdk>,
        seed: String,
    ) -> Self {
        Self {
            config,
            backend,
            scripts,
            sdk,
            seed,
            generation: Cell::new(0),
            inflight: RefCell::new(None),
            session: RefCell::new(None),
        }
    }

    fn signature_for(&self, draft: &ChargeDraft) -> SignatureKey {
        SignatureKey::compute(&SignatureInput {
            amount_cents: draft.amount_cents,
            currency: &draft.currency,
            team_id: draft.team_id.as_deref(),
            donor_email: &draft.donor_email,
            theme: &draft.theme,
            provider: ProviderKind::Stripe,
        })
    }

    fn script_attrs(&self) -> ScriptAttrs {
        ScriptAttrs {
            nonce: self.config.script_nonce.clone(),
            crossorigin: None,
        }
    }

    fn superseded(&self, generation: u64) -> bool {
        self.generation.get() != generation
    }

    fn set_status(&self, status: SessionStatus) {
        if let Some(session) = self.session.borrow_mut().as_mut() {
            session.status = status;
        }
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for StripeAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stripe
    }

    fn available(&self) -> bool {
        self.config.stripe_public_key.is_some()
    }

    async fn prewarm(&self) {
        if !self.available() {
            return;
        }
        if let Err(err) = self.scripts.ensure(STRIPE_JS_URL, &self.script_attrs()).await {
            tracing::debug!(%err, "stripe prewarm skipped");
        }
    }

    async fn prepare(&self, draft: &ChargeDraft, force: bool) -> PrepareOutcome {
        let Some(configured_key) = self.config.stripe_public_key.clone() else {
            return PrepareOutcome::Unavailable;
        };

        let signature = self.signature_for(draft);
        if !force
            && self
                .session
                .borrow()
                .as_ref()
                .is_some_and(|session| session.matches(&signature))
        {
            // memoized: same signature, session reused verbatim
            return PrepareOutcome::Ready;
        }

        // a newer signature supersedes and aborts the previous request
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        if let Some(handle) = self.inflight.borrow_mut().take() {
            handle.abort();
        }
        *self.session.borrow_mut() =
            Some(PaymentSession::preparing(ProviderKind::Stripe, signature.clone()));

        if let Err(err) = self.scripts.ensure(STRIPE_JS_URL, &self.script_attrs()).await {
            if self.superseded(generation) {
                return PrepareOutcome::Superseded;
            }
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(err);
        }
        if self.superseded(generation) {
            return PrepareOutcome::Superseded;
        }

        let token = IdempotencyToken::derive(&self.seed, &signature);
        let request = CreateSessionRequest::from_charge(draft, &token);
        let (handle, registration) = AbortHandle::new_pair();
        *self.inflight.borrow_mut() = Some(handle);

        let result = Abortable::new(self.backend.create_stripe_intent(&request), registration).await;

        // drop stale responses: only the owner of the current generation
        // may touch the session or the mount container
        if self.superseded(generation) {
            return PrepareOutcome::Superseded;
        }
        self.inflight.borrow_mut().take();

        let response = match result {
            Err(Aborted) => return PrepareOutcome::Superseded,
            Ok(Err(err)) => {
                self.set_status(SessionStatus::Failed);
                return PrepareOutcome::Failed(err);
            }
            Ok(Ok(response)) => response,
        };

        if let Some(message) = response.error {
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(PaymentError::Provider(message));
        }
        let Some(client_secret) = response.client_secret else {
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(PaymentError::Provider(
                "The server did not return a payment session.".into(),
            ));
        };
        let public_key = response.public_key.unwrap_or(configured_key);

        // fully unmount before mounting; never append alongside stale UI
        self.sdk.unmount();
        if let Err(err) = self.sdk.mount(&public_key, &client_secret, &draft.theme).await {
            if self.superseded(generation) {
                return PrepareOutcome::Superseded;
            }
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(err);
        }
        if self.superseded(generation) {
            return PrepareOutcome::Superseded;
        }

        tracing::info!(provider = %ProviderKind::Stripe, signature = %signature, "payment session ready");
        *self.session.borrow_mut() = Some(PaymentSession::ready(
            ProviderKind::Stripe,
            signature,
            client_secret,
        ));
        PrepareOutcome::Ready
    }

    fn teardown(&self) {
        // invalidate any parked prepare before touching the container
        self.generation.set(self.generation.get() + 1);
        if let Some(handle) = self.inflight.borrow_mut().take() {
            handle.abort();
        }
        self.sdk.unmount();
        *self.session.borrow_mut() = None;
    }

    async fn confirm(&self, _draft: &ChargeDraft) -> ConfirmOutcome {
        let ready = self
            .session
            .borrow()
            .as_ref()
            .is_some_and(|session| session.status == SessionStatus::Ready);
        if !ready {
            tracing::warn!("stripe confirm without a ready session");
            return ConfirmOutcome::Failed { message: None };
        }

        self.set_status(SessionStatus::Confirming);
        match self.sdk.confirm(&self.config.return_url).await {
            Ok(status) => match status.as_str() {
                "succeeded" => {
                    self.set_status(SessionStatus::Succeeded);
                    ConfirmOutcome::Succeeded
                }
                "processing" => {
                    self.set_status(SessionStatus::Succeeded);
                    ConfirmOutcome::Pending
                }
                other => {
                    tracing::warn!(status = other, "ambiguous confirmation status treated as failure");
                    // session still valid; the attempt stays retryable
                    self.set_status(SessionStatus::Ready);
                    ConfirmOutcome::Failed { message: None }
                }
            },
            Err(PaymentError::Provider(message)) => {
                self.set_status(SessionStatus::Ready);
                ConfirmOutcome::Failed {
                    message: Some(message),
                }
            }
            Err(err) => {
                self.set_status(SessionStatus::Ready);
                ConfirmOutcome::Failed {
                    message: Some(err.user_message()),
                }
            }
        }
    }

    fn session_status(&self) -> SessionStatus {
        self.session
            .borrow()
            .as_ref()
            .map_or(SessionStatus::None, |session| session.status)
    }
}
