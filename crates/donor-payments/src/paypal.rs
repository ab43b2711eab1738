//! PayPal Wallet Adapter
//!
//! Order-then-capture flow: the server creates an order, the buttons
//! render against it, buyer approval comes back through the web bridge,
//! and `confirm` captures through the server boundary.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::{AbortHandle, Abortable, Aborted};

use donor_core::CheckoutConfig;

use crate::adapter::{ConfirmOutcome, PrepareOutcome, ProviderAdapter};
use crate::api::{CaptureRequest, CheckoutBackend, CreateSessionRequest};
use crate::error::PaymentError;
use crate::script::{ScriptAttrs, ScriptLoader};
use crate::session::{ChargeDraft, PaymentSession, ProviderKind, SessionStatus};
use crate::signature::{IdempotencyToken, SignatureInput, SignatureKey};

/// The slice of the PayPal JS SDK this adapter needs.
#[async_trait(?Send)]
pub trait WalletButtonsSdk {
    /// Render the buttons bound to `order_id`, replacing any previously
    /// rendered buttons.
    async fn mount(&self, order_id: &str) -> Result<(), PaymentError>;

    fn unmount(&self);
}

pub struct PaypalAdapter {
    config: Rc<CheckoutConfig>,
    backend: Rc<dyn CheckoutBackend>,
    scripts: Rc<ScriptLoader>,
    sdk: Rc<dyn WalletButtonsSdk>,
    seed: String,
    generation: Cell<u64>,
    inflight: RefCell<Option<AbortHandle>>,
    session: RefCell<Option<PaymentSession>>,
}

impl PaypalAdapter {
    pub fn new(
        config: Rc<CheckoutConfig>,
        backend: Rc<dyn CheckoutBackend>,
        scripts: Rc<ScriptLoader>,
        sdk: Rc<dyn WalletButtonsSdk>,
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

    /// SDK URL carries the client id and currency as query parameters.
    fn sdk_url(&self, client_id: &str) -> String {
        format!(
            "https://www.paypal.com/sdk/js?client-id={client_id}&currency={}&intent=capture&components=buttons",
            self.config.currency
        )
    }

    fn signature_for(&self, draft: &ChargeDraft) -> SignatureKey {
        SignatureKey::compute(&SignatureInput {
            amount_cents: draft.amount_cents,
            currency: &draft.currency,
            team_id: draft.team_id.as_deref(),
            donor_email: &draft.donor_email,
            theme: &draft.theme,
            provider: ProviderKind::Paypal,
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
impl ProviderAdapter for PaypalAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Paypal
    }

    fn available(&self) -> bool {
        self.config.paypal_client_id.is_some()
    }

    async fn prewarm(&self) {
        let Some(client_id) = self.config.paypal_client_id.clone() else {
            return;
        };
        let url = self.sdk_url(&client_id);
        if let Err(err) = self.scripts.ensure(&url, &self.script_attrs()).await {
            tracing::debug!(%err, "paypal prewarm skipped");
        }
    }

    async fn prepare(&self, draft: &ChargeDraft, force: bool) -> PrepareOutcome {
        let Some(client_id) = self.config.paypal_client_id.clone() else {
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
            return PrepareOutcome::Ready;
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        if let Some(handle) = self.inflight.borrow_mut().take() {
            handle.abort();
        }
        *self.session.borrow_mut() =
            Some(PaymentSession::preparing(ProviderKind::Paypal, signature.clone()));

        let url = self.sdk_url(&client_id);
        if let Err(err) = self.scripts.ensure(&url, &self.script_attrs()).await {
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

        let result = Abortable::new(self.backend.create_paypal_order(&request), registration).await;
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
        let Some(order_id) = response.order_id else {
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(PaymentError::Provider(
                "The server did not return an order.".into(),
            ));
        };

        self.sdk.unmount();
        if let Err(err) = self.sdk.mount(&order_id).await {
            if self.superseded(generation) {
                return PrepareOutcome::Superseded;
            }
            self.set_status(SessionStatus::Failed);
            return PrepareOutcome::Failed(err);
        }
        if self.superseded(generation) {
            return PrepareOutcome::Superseded;
        }

        tracing::info!(provider = %ProviderKind::Paypal, signature = %signature, "order ready");
        *self.session.borrow_mut() = Some(PaymentSession::ready(
            ProviderKind::Paypal,
            signature,
            order_id,
        ));
        PrepareOutcome::Ready
    }

    fn teardown(&self) {
        self.generation.set(self.generation.get() + 1);
        if let Some(handle) = self.inflight.borrow_mut().take() {
            handle.abort();
        }
        self.sdk.unmount();
        *self.session.borrow_mut() = None;
    }

    async fn confirm(&self, draft: &ChargeDraft) -> ConfirmOutcome {
        let order_id = {
            let session = self.session.borrow();
            match session.as_ref() {
                Some(session) if session.status == SessionStatus::Ready => {
                    session.credential.clone()
                }
                _ => {
                    tracing::warn!("paypal capture without a ready order");
                    return ConfirmOutcome::Failed { message: None };
                }
            }
        };

        self.set_status(SessionStatus::Confirming);
        let token = IdempotencyToken::derive(&self.seed, &self.signature_for(draft));
        let request = CaptureRequest {
            order_id,
            charge: CreateSessionRequest::from_charge(draft, &token),
        };

        match self.backend.capture_paypal_order(&request).await {
            Ok(response) => {
                if let Some(message) = response.error {
                    self.set_status(SessionStatus::Ready);
                    return ConfirmOutcome::Failed {
                        message: Some(message),
                    };
                }
                match response.status.as_deref() {
                    Some("COMPLETED") => {
                        self.set_status(SessionStatus::Succeeded);
                        ConfirmOutcome::Succeeded
                    }
                    Some("PENDING") => {
                        self.set_status(SessionStatus::Succeeded);
                        ConfirmOutcome::Pending
                    }
                    other => {
                        tracing::warn!(status = ?other, "ambiguous capture status treated as failure");
                        // the order may be consumed; require a fresh session
                        self.set_status(SessionStatus::Failed);
                        ConfirmOutcome::Failed { message: None }
                    }
                }
            }
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
