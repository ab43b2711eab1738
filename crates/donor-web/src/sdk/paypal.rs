//! PayPal SDK Bridge
//!
//! Renders `paypal.Buttons` bound to a server-created order. The buttons
//! own their own click-through; buyer approval fires the hook installed
//! by the app wiring, which feeds the orchestrator's uniform submit
//! flow (capture happens through the server boundary, not here).

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use donor_payments::paypal::WalletButtonsSdk;
use donor_payments::PaymentError;

use super::js;
use crate::dom;

/// Container the buttons render into.
pub const WALLET_CONTAINER_ID: &str = "paypal-buttons";

#[derive(Default)]
pub struct PaypalJsSdk {
    on_approved: RefCell<Option<Rc<dyn Fn()>>>,
    buttons: RefCell<Option<JsValue>>,
}

impl PaypalJsSdk {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Installed once by the app wiring; invoked on buyer approval.
    pub fn set_approval_hook(&self, hook: Rc<dyn Fn()>) {
        *self.on_approved.borrow_mut() = Some(hook);
    }
}

#[async_trait(?Send)]
impl WalletButtonsSdk for PaypalJsSdk {
    async fn mount(&self, order_id: &str) -> Result<(), PaymentError> {
        self.unmount();

        let paypal = js::global("paypal")?;

        let order = order_id.to_string();
        let create_order =
            Closure::<dyn FnMut() -> JsValue>::new(move || JsValue::from_str(&order));

        let hook = self.on_approved.borrow().clone();
        let on_approve = Closure::<dyn FnMut(JsValue, JsValue) -> JsValue>::new(
            move |_data: JsValue, _actions: JsValue| {
                if let Some(hook) = &hook {
                    hook();
                }
                JsValue::UNDEFINED
            },
        );

        let options = js::object(&[
            ("createOrder", create_order.into_js_value()),
            ("onApprove", on_approve.into_js_value()),
        ]);

        let buttons = js::call(&paypal, "Buttons", &[options])?;
        let render = js::call(
            &buttons,
            "render",
            &[JsValue::from_str(&format!("#{WALLET_CONTAINER_ID}"))],
        )?;
        if let Ok(promise) = render.dyn_into::<js_sys::Promise>() {
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        }

        *self.buttons.borrow_mut() = Some(buttons);
        Ok(())
    }

    fn unmount(&self) {
        if let Some(buttons) = self.buttons.borrow_mut().take() {
            let _ = js::call(&buttons, "close", &[]);
        }
        if let Some(container) = dom::element_by_id(WALLET_CONTAINER_ID) {
            container.set_inner_html("");
        }
    }
}
