//! HTTP Handlers
//!
//! Implements the checkout engine's server boundary for development:
//! session creation with idempotency collapse, wallet capture with an
//! amount cross-check, and the public config endpoint.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use donor_payments::api::{
    CaptureRequest, CaptureResponse, CreateSessionRequest, CreateSessionResponse,
    PublicConfigResponse, CSRF_HEADER,
};

use crate::state::AppState;

/// Smallest billable donation the dev server accepts.
const MINIMUM_AMOUNT_CENTS: i64 = 100;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub paypal_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.stripe_public_key.is_some(),
        paypal_configured: state.paypal_client_id.is_some(),
    })
}

/// Public keys for pages that don't embed them statically
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    Json(PublicConfigResponse {
        stripe_public_key: state.stripe_public_key.clone(),
        paypal_client_id: state.paypal_client_id.clone(),
    })
}

/// Card provider session creation
pub async fn create_stripe_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, HandlerError> {
    require_csrf(&state, &headers)?;
    validate(&payload)?;
    if state.stripe_public_key.is_none() {
        return Err(reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "Card payments are not configured.",
        ));
    }
    Ok(Json(state.ledger.intent_for(&payload)))
}

/// Wallet provider order creation
pub async fn create_paypal_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, HandlerError> {
    require_csrf(&state, &headers)?;
    validate(&payload)?;
    if state.paypal_client_id.is_none() {
        return Err(reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "Wallet payments are not configured.",
        ));
    }
    Ok(Json(state.ledger.order_for(&payload)))
}

/// Wallet capture; failures come back as a body-level flag the engine
/// surfaces verbatim
pub async fn capture_paypal_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, HandlerError> {
    require_csrf(&state, &headers)?;
    Ok(Json(state.ledger.capture(&payload)))
}

// ============================================================================
// Helpers
// ============================================================================

fn require_csrf(state: &AppState, headers: &HeaderMap) -> Result<(), HandlerError> {
    let Some(expected) = &state.csrf_token else {
        return Ok(());
    };
    let provided = headers.get(CSRF_HEADER).and_then(|value| value.to_str().ok());
    if provided == Some(expected.as_str()) {
        Ok(())
    } else {
        tracing::warn!("mutating request rejected: bad CSRF token");
        Err(reject(
            StatusCode::FORBIDDEN,
            "Missing or invalid CSRF token.",
        ))
    }
}

fn validate(request: &CreateSessionRequest) -> Result<(), HandlerError> {
    if request.amount_cents < MINIMUM_AMOUNT_CENTS {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The minimum donation is 1.00.",
        ));
    }
    if request.currency.len() != 3 {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Unsupported currency.",
        ));
    }
    if request.idempotency_key.is_empty() {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Missing idempotency key.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionLedger;
    use donor_payments::api::{Attribution, DonorFields};
    use std::sync::Arc;

    fn state(csrf: Option<&str>) -> AppState {
        AppState {
            stripe_public_key: Some("pk_test_1".into()),
            paypal_client_id: Some("client-1".into()),
            csrf_token: csrf.map(String::from),
            ledger: Arc::new(SessionLedger::new()),
        }
    }

    fn request(amount: i64) -> CreateSessionRequest {
        CreateSessionRequest {
            amount_cents: amount,
            currency: "USD".into(),
            donor: DonorFields {
                email: "donor@example.com".into(),
                name: "A Donor".into(),
            },
            attribution: Attribution { team_id: None },
            idempotency_key: "key-1".into(),
        }
    }

    #[tokio::test]
    async fn test_intent_requires_csrf_header() {
        let state = state(Some("token-1"));

        let missing = create_stripe_intent(
            State(state.clone()),
            HeaderMap::new(),
            Json(request(2500)),
        )
        .await;
        assert!(missing.is_err());

        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER, "token-1".parse().unwrap());
        let ok = create_stripe_intent(State(state), headers, Json(request(2500))).await;
        assert!(ok.unwrap().0.client_secret.is_some());
    }

    #[tokio::test]
    async fn test_below_minimum_is_rejected_with_message() {
        let state = state(None);
        let result =
            create_stripe_intent(State(state), HeaderMap::new(), Json(request(50))).await;
        let (status, body) = result.err().unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0.error, "The minimum donation is 1.00.");
    }
}
