//! Application State

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use donor_payments::api::{CaptureRequest, CaptureResponse, CreateSessionRequest, CreateSessionResponse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Stripe publishable key served to the page (optional)
    pub stripe_public_key: Option<String>,

    /// PayPal client id served to the page (optional)
    pub paypal_client_id: Option<String>,

    /// Expected CSRF token for mutating requests (None disables the check)
    pub csrf_token: Option<String>,

    /// In-memory session ledger
    pub ledger: Arc<SessionLedger>,
}

/// Collapses retried session-creation requests onto the same credential
/// by idempotency key, the way a production backend would against the
/// provider APIs.
#[derive(Default)]
pub struct SessionLedger {
    intents: Mutex<HashMap<String, CreateSessionResponse>>,
    orders: Mutex<HashMap<String, CreateSessionResponse>>,
    order_amounts: Mutex<HashMap<String, i64>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Card intent: one credential per idempotency key.
    pub fn intent_for(&self, request: &CreateSessionRequest) -> CreateSessionResponse {
        let mut intents = self.intents.lock().unwrap();
        intents
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| {
                let id = Uuid::new_v4().simple().to_string();
                let secret = Uuid::new_v4().simple().to_string();
                tracing::info!(
                    amount_cents = request.amount_cents,
                    team = ?request.attribution.team_id,
                    "created dev payment intent"
                );
                CreateSessionResponse {
                    client_secret: Some(format!("pi_dev_{id}_secret_{secret}")),
                    ..Default::default()
                }
            })
            .clone()
    }

    /// Wallet order: one order per idempotency key; the amount is
    /// recorded so capture can cross-check it.
    pub fn order_for(&self, request: &CreateSessionRequest) -> CreateSessionResponse {
        let mut orders = self.orders.lock().unwrap();
        orders
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| {
                let order_id = format!("ORD-{}", Uuid::new_v4().simple());
                self.order_amounts
                    .lock()
                    .unwrap()
                    .insert(order_id.clone(), request.amount_cents);
                tracing::info!(
                    amount_cents = request.amount_cents,
                    order_id = %order_id,
                    "created dev order"
                );
                CreateSessionResponse {
                    order_id: Some(order_id),
                    ..Default::default()
                }
            })
            .clone()
    }

    /// Capture: succeeds only for a known order whose amount matches the
    /// submitted charge.
    pub fn capture(&self, request: &CaptureRequest) -> CaptureResponse {
        let amounts = self.order_amounts.lock().unwrap();
        match amounts.get(&request.order_id) {
            Some(amount) if *amount == request.charge.amount_cents => CaptureResponse {
                status: Some("COMPLETED".into()),
                error: None,
            },
            Some(_) => CaptureResponse {
                status: None,
                error: Some("Captured amount does not match the approved order.".into()),
            },
            None => CaptureResponse {
                status: None,
                error: Some("Unknown order.".into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donor_payments::api::{Attribution, DonorFields};

    fn request(key: &str, amount: i64) -> CreateSessionRequest {
        CreateSessionRequest {
            amount_cents: amount,
            currency: "USD".into(),
            donor: DonorFields {
                email: "donor@example.com".into(),
                name: "A Donor".into(),
            },
            attribution: Attribution { team_id: None },
            idempotency_key: key.into(),
        }
    }

    #[test]
    fn test_intents_collapse_on_idempotency_key() {
        let ledger = SessionLedger::new();
        let first = ledger.intent_for(&request("key-1", 2500));
        let retry = ledger.intent_for(&request("key-1", 2500));
        assert_eq!(first.client_secret, retry.client_secret);

        let other = ledger.intent_for(&request("key-2", 2500));
        assert_ne!(first.client_secret, other.client_secret);
    }

    #[test]
    fn test_capture_cross_checks_amount() {
        let ledger = SessionLedger::new();
        let order = ledger.order_for(&request("key-1", 2500));
        let order_id = order.order_id.unwrap();

        let ok = ledger.capture(&CaptureRequest {
            order_id: order_id.clone(),
            charge: request("key-1", 2500),
        });
        assert_eq!(ok.status.as_deref(), Some("COMPLETED"));

        let mismatched = ledger.capture(&CaptureRequest {
            order_id,
            charge: request("key-1", 9900),
        });
        assert!(mismatched.error.is_some());

        let unknown = ledger.capture(&CaptureRequest {
            order_id: "ORD-missing".into(),
            charge: request("key-1", 2500),
        });
        assert_eq!(unknown.error.as_deref(), Some("Unknown order."));
    }
}
