//! Stripe.js Bridge
//!
//! Implements the card-element SDK seam against the `Stripe` global:
//! `Stripe(pk).elements({clientSecret}).create("payment").mount(...)`,
//! then `confirmPayment` with `redirect: "if_required"` so the page is
//! left alone unless the bank demands a hop.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::Function;
use wasm_bindgen::{JsCast, JsValue};

use donor_payments::stripe::CardElementSdk;
use donor_payments::PaymentError;

use super::js;
use crate::dom;

/// Container the payment element mounts into.
pub const CARD_CONTAINER_ID: &str = "stripe-payment-element";

struct MountedElement {
    stripe: JsValue,
    elements: JsValue,
    payment_element: JsValue,
}

#[derive(Default)]
pub struct StripeJsSdk {
    mounted: RefCell<Option<MountedElement>>,
}

impl StripeJsSdk {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

#[async_trait(?Send)]
impl CardElementSdk for StripeJsSdk {
    async fn mount(
        &self,
        public_key: &str,
        client_secret: &str,
        theme: &str,
    ) -> Result<(), PaymentError> {
        self.unmount();

        let constructor: Function = js::global("Stripe")?
            .dyn_into()
            .map_err(|_| PaymentError::Provider("Stripe global is not callable".into()))?;
        let stripe = constructor
            .call1(&JsValue::NULL, &JsValue::from_str(public_key))
            .map_err(|err| PaymentError::Provider(js::error_message(&err)))?;

        let appearance = js::object(&[("theme", JsValue::from_str(theme))]);
        let options = js::object(&[
            ("clientSecret", JsValue::from_str(client_secret)),
            ("appearance", appearance),
        ]);
        let elements = js::call(&stripe, "elements", &[options])?;
        let payment_element = js::call(&elements, "create", &[JsValue::from_str("payment")])?;
        js::call(
            &payment_element,
            "mount",
            &[JsValue::from_str(&format!("#{CARD_CONTAINER_ID}"))],
        )?;

        *self.mounted.borrow_mut() = Some(MountedElement {
            stripe,
            elements,
            payment_element,
        });
        Ok(())
    }

    fn unmount(&self) {
        if let Some(mounted) = self.mounted.borrow_mut().take() {
            let _ = js::call(&mounted.payment_element, "unmount", &[]);
        }
        // whatever is left in the container is stale by definition
        if let Some(container) = dom::element_by_id(CARD_CONTAINER_ID) {
            container.set_inner_html("");
        }
    }

    async fn confirm(&self, return_url: &str) -> Result<String, PaymentError> {
        let (stripe, elements) = {
            let mounted = self.mounted.borrow();
            let Some(mounted) = mounted.as_ref() else {
                return Err(PaymentError::Provider("No payment form is mounted.".into()));
            };
            (mounted.stripe.clone(), mounted.elements.clone())
        };

        let confirm_params = js::object(&[("return_url", JsValue::from_str(return_url))]);
        let options = js::object(&[
            ("elements", elements),
            ("confirmParams", confirm_params),
            ("redirect", JsValue::from_str("if_required")),
        ]);

        let result = js::await_promise(js::call(&stripe, "confirmPayment", &[options])?).await?;

        if let Some(error) = js::get(&result, "error") {
            // Stripe reports declines here rather than rejecting
            return Err(PaymentError::Provider(
                js::get(&error, "message")
                    .and_then(|message| message.as_string())
                    .unwrap_or_else(|| "Payment failed.".into()),
            ));
        }

        Ok(js::get(&result, "paymentIntent")
            .and_then(|intent| js::get(&intent, "status"))
            .and_then(|status| status.as_string())
            .unwrap_or_default())
    }
}
