//! Script Host
//!
//! Appends `<script>` tags for provider SDKs, resolving on their
//! load/error events. Deduplication lives in the payments crate's
//! `ScriptLoader`; this host only knows how to inject one tag.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlScriptElement;

use donor_payments::script::{ScriptAttrs, ScriptError, ScriptHost};

use super::document;

pub struct DomScriptHost;

impl ScriptHost for DomScriptHost {
    fn inject(
        &self,
        url: &str,
        attrs: &ScriptAttrs,
    ) -> LocalBoxFuture<'static, Result<(), ScriptError>> {
        let url = url.to_string();
        let attrs = attrs.clone();
        async move {
            let Some(document) = document() else {
                return Err(ScriptError::Load("document unavailable".into()));
            };

            // a tag already present and marked loaded resolves immediately
            let selector = format!(r#"script[src="{url}"]"#);
            if let Ok(Some(existing)) = document.query_selector(&selector) {
                if existing.get_attribute("data-loaded").as_deref() == Some("true") {
                    return Ok(());
                }
            }

            let script: HtmlScriptElement = document
                .create_element("script")
                .ok()
                .and_then(|element| element.dyn_into().ok())
                .ok_or_else(|| ScriptError::Load("could not create script element".into()))?;
            script.set_src(&url);
            script.set_async(true);
            if let Some(nonce) = &attrs.nonce {
                let _ = script.set_attribute("nonce", nonce);
            }
            if let Some(crossorigin) = &attrs.crossorigin {
                let _ = script.set_attribute("crossorigin", crossorigin);
            }

            let promise = js_sys::Promise::new(&mut |resolve, reject| {
                let marked = script.clone();
                let on_load = Closure::once_into_js(move || {
                    let _ = marked.set_attribute("data-loaded", "true");
                    let _ = resolve.call0(&JsValue::NULL);
                });
                script.set_onload(Some(on_load.unchecked_ref()));

                let on_error = Closure::once_into_js(move || {
                    let _ = reject.call0(&JsValue::NULL);
                });
                script.set_onerror(Some(on_error.unchecked_ref()));
            });

            if let Some(head) = document.head() {
                let _ = head.append_child(&script);
            } else {
                return Err(ScriptError::Load("document has no head".into()));
            }

            match wasm_bindgen_futures::JsFuture::from(promise).await {
                Ok(_) => Ok(()),
                Err(_) => Err(ScriptError::Load(url)),
            }
        }
        .boxed_local()
    }
}
