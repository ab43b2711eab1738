//! donor-kit Development Server
//!
//! Axum server implementing the checkout engine's server boundary:
//! session creation with in-memory idempotency collapse, wallet capture,
//! the public config endpoint, and static hosting for the WASM bundle.
//! No real provider calls and no persistence — this is the boundary
//! harness the frontend develops against.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{
    capture_paypal_order, create_paypal_order, create_stripe_intent, health_check, public_config,
};
use crate::state::{AppState, SessionLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let stripe_public_key = std::env::var("STRIPE_PUBLIC_KEY").ok();
    let paypal_client_id = std::env::var("PAYPAL_CLIENT_ID").ok();
    let csrf_token = std::env::var("CSRF_TOKEN").ok();

    if stripe_public_key.is_some() {
        tracing::info!("✓ Card provider configured");
    } else {
        tracing::warn!("⚠ STRIPE_PUBLIC_KEY not set - card provider disabled");
    }
    if paypal_client_id.is_some() {
        tracing::info!("✓ Wallet provider configured");
    } else {
        tracing::warn!("⚠ PAYPAL_CLIENT_ID not set - wallet provider disabled");
    }
    if csrf_token.is_none() {
        tracing::warn!("⚠ CSRF_TOKEN not set - CSRF check disabled (dev only)");
    }

    let state = AppState {
        stripe_public_key,
        paypal_client_id,
        csrf_token,
        ledger: Arc::new(SessionLedger::new()),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & config
        .route("/health", get(health_check))
        .route("/api/checkout/config", get(public_config))
        // Session boundary
        .route("/api/checkout/stripe/intent", post(create_stripe_intent))
        .route("/api/checkout/paypal/order", post(create_paypal_order))
        .route("/api/checkout/paypal/capture", post(capture_paypal_order))
        // Static files (WASM frontend)
        .nest_service("/", tower_http::services::ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("donor-kit dev server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /api/checkout/config         - Public provider keys");
    tracing::info!("  POST /api/checkout/stripe/intent  - Create card session");
    tracing::info!("  POST /api/checkout/paypal/order   - Create wallet order");
    tracing::info!("  POST /api/checkout/paypal/capture - Capture wallet order");

    axum::serve(listener, app).await?;

    Ok(())
}
