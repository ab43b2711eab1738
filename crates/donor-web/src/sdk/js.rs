//! Reflect Helpers
//!
//! Dynamic property access and method calls on SDK globals, with JS
//! errors mined for their `message` so the donor sees the provider's
//! own wording.

use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use donor_payments::PaymentError;

/// Look up a window global, failing with a typed error when the SDK has
/// not actually loaded.
pub fn global(name: &str) -> Result<JsValue, PaymentError> {
    let window = web_sys::window()
        .ok_or_else(|| PaymentError::Provider("window unavailable".into()))?;
    let value = Reflect::get(&window, &JsValue::from_str(name))
        .map_err(|err| PaymentError::Provider(error_message(&err)))?;
    if value.is_undefined() || value.is_null() {
        return Err(PaymentError::Provider(format!("{name} SDK is not loaded")));
    }
    Ok(value)
}

/// Property access; `None` for missing/null/undefined.
pub fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// Call `target.method(args…)`.
pub fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, PaymentError> {
    let function: Function = get(target, method)
        .and_then(|value| value.dyn_into().ok())
        .ok_or_else(|| PaymentError::Provider(format!("SDK method {method} is missing")))?;
    let array = Array::new();
    for arg in args {
        array.push(arg);
    }
    Reflect::apply(&function, target, &array)
        .map_err(|err| PaymentError::Provider(error_message(&err)))
}

/// Await a JS promise, converting a rejection into a typed error.
pub async fn await_promise(value: JsValue) -> Result<JsValue, PaymentError> {
    let promise: Promise = value
        .dyn_into()
        .map_err(|_| PaymentError::Provider("SDK call did not return a promise".into()))?;
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|err| PaymentError::Provider(error_message(&err)))
}

/// Build a plain `{key: value}` options object.
pub fn object(entries: &[(&str, JsValue)]) -> JsValue {
    let object = Object::new();
    for (key, value) in entries {
        let _ = Reflect::set(&object, &JsValue::from_str(key), value);
    }
    object.into()
}

/// Best-effort extraction of a human-readable message from a JS error.
pub fn error_message(err: &JsValue) -> String {
    get(err, "message")
        .and_then(|message| message.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "Unknown SDK error".into())
}
