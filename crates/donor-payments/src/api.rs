//! Server API Client
//!
//! Typed client for the session-creation boundary. Every mutating
//! request carries the page's CSRF token and a bounded timeout (distinct
//! from user/supersede cancellation, which aborts from the outside).

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, Either};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use donor_core::CheckoutConfig;

use crate::error::{PaymentError, Result};
use crate::session::ChargeDraft;
use crate::signature::IdempotencyToken;
use crate::time::Sleeper;

/// Header carrying the page CSRF token on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DonorFields {
    pub email: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Body for both providers' session-creation endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub donor: DonorFields,
    pub attribution: Attribution,
    pub idempotency_key: String,
}

impl CreateSessionRequest {
    pub fn from_charge(charge: &ChargeDraft, token: &IdempotencyToken) -> Self {
        Self {
            amount_cents: charge.amount_cents,
            currency: charge.currency.clone(),
            donor: DonorFields {
                email: charge.donor_email.clone(),
                name: charge.donor_name.clone(),
            },
            attribution: Attribution {
                team_id: charge.team_id.clone(),
            },
            idempotency_key: token.as_str().into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    /// Card provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Wallet provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Optional provider public key when not embedded in the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Body-level failure flag; surfaced verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wallet capture request: the order id plus the full charge fields so
/// the server can cross-check the approved amount.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub order_id: String,
    #[serde(flatten)]
    pub charge: CreateSessionRequest,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CaptureResponse {
    /// Provider status word, e.g. `COMPLETED` / `PENDING`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Served when provider keys are not statically embedded in the page.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PublicConfigResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paypal_client_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// The server boundary as the adapters see it. `CheckoutApi` is the
/// real implementation; tests substitute a recording fake.
#[async_trait(?Send)]
pub trait CheckoutBackend {
    async fn create_stripe_intent(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse>;

    async fn create_paypal_order(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse>;

    async fn capture_paypal_order(&self, request: &CaptureRequest) -> Result<CaptureResponse>;
}

/// reqwest-backed client for the session endpoints.
pub struct CheckoutApi {
    http: reqwest::Client,
    base: String,
    csrf: Option<String>,
    sleeper: Rc<dyn Sleeper>,
    timeout: Duration,
}

impl CheckoutApi {
    pub fn new(config: &CheckoutConfig, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: config.api_base.trim_end_matches('/').to_string(),
            csrf: config.csrf_token.clone(),
            sleeper,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub async fn fetch_public_config(&self) -> Result<PublicConfigResponse> {
        let url = format!("{}/api/checkout/config", self.base);
        let response = self.bounded(self.http.get(&url).send()).await?;
        Self::read_json(response).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base);
        let mut builder = self.http.post(&url).json(body);
        if let Some(token) = &self.csrf {
            builder = builder.header(CSRF_HEADER, token);
        }
        let response = self.bounded(builder.send()).await?;
        Self::read_json(response).await
    }

    /// Race the request against the timeout clock. A timeout cancels the
    /// underlying request by dropping it.
    async fn bounded<F>(&self, request: F) -> Result<reqwest::Response>
    where
        F: std::future::Future<Output = reqwest::Result<reqwest::Response>> + 'static,
    {
        let sleep = self.sleeper.sleep(self.timeout);
        match future::select(Box::pin(request), sleep).await {
            Either::Left((result, _)) => result.map_err(|err| PaymentError::Network {
                message: err.to_string(),
                timed_out: false,
            }),
            Either::Right(((), _)) => Err(PaymentError::Network {
                message: format!("no response within {}s", self.timeout.as_secs()),
                timed_out: true,
            }),
        }
    }

    async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|err| PaymentError::Network {
                message: format!("unreadable response: {err}"),
                timed_out: false,
            });
        }
        // non-2xx: surface a server-provided message verbatim if present
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error);
        match message {
            Some(message) => Err(PaymentError::Provider(message)),
            None => Err(PaymentError::Network {
                message: format!("HTTP {status}"),
                timed_out: false,
            }),
        }
    }
}

#[async_trait(?Send)]
impl CheckoutBackend for CheckoutApi {
    async fn create_stripe_intent(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        self.post_json("/api/checkout/stripe/intent", request).await
    }

    async fn create_paypal_order(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        self.post_json("/api/checkout/paypal/order", request).await
    }

    async fn capture_paypal_order(&self, request: &CaptureRequest) -> Result<CaptureResponse> {
        self.post_json("/api/checkout/paypal/capture", request).await
    }
}
