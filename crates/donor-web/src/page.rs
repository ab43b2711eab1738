//! Page-Supplied Configuration
//!
//! The host page embeds a JSON blob in a `<script type="application/json"
//! id="checkout-config">` tag; meta tags supply the CSRF token and CSP
//! nonce when the blob doesn't.

use std::rc::Rc;

use donor_core::CheckoutConfig;
use donor_payments::{CheckoutApi, Sleeper};

use crate::dom;

/// Resolve the full configuration: the embedded blob first, then the
/// server config endpoint when no provider key is embedded. A failed
/// fetch is not fatal; the providers simply self-disable.
pub async fn resolve_config(sleeper: Rc<dyn Sleeper>) -> CheckoutConfig {
    let mut config = load_page_config();
    if config.stripe_public_key.is_none() && config.paypal_client_id.is_none() {
        let api = CheckoutApi::new(&config, sleeper);
        match api.fetch_public_config().await {
            Ok(keys) => {
                config.stripe_public_key = keys.stripe_public_key;
                config.paypal_client_id = keys.paypal_client_id;
            }
            Err(err) => {
                leptos::logging::warn!("config endpoint unavailable: {err}");
            }
        }
    }
    config
}

pub fn load_page_config() -> CheckoutConfig {
    let raw = dom::element_by_id("checkout-config")
        .and_then(|element| element.text_content())
        .unwrap_or_default();

    let mut config = if raw.trim().is_empty() {
        CheckoutConfig::default()
    } else {
        CheckoutConfig::from_json(&raw).unwrap_or_else(|_| CheckoutConfig::default())
    };

    if config.csrf_token.is_none() {
        config.csrf_token = meta_content("csrf-token");
    }
    if config.script_nonce.is_none() {
        config.script_nonce = meta_content("csp-nonce");
    }
    config
}

fn meta_content(name: &str) -> Option<String> {
    let document = dom::document()?;
    let element = document
        .query_selector(&format!(r#"meta[name="{name}"]"#))
        .ok()??;
    element.get_attribute("content").filter(|content| !content.is_empty())
}
