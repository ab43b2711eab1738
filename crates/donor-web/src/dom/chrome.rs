//! Page Chrome
//!
//! Page-global effects owned by the overlay manager: focus capture, the
//! scroll lock (with scrollbar compensation), background inertness, and
//! URL-hash synchronization through `history.replaceState` so no scroll
//! jump occurs.

use std::cell::RefCell;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CssStyleDeclaration, HtmlElement};

use donor_core::{FocusTarget, PageChrome};

use super::document;

struct DomFocusTarget {
    element: HtmlElement,
}

impl FocusTarget for DomFocusTarget {
    fn is_connected(&self) -> bool {
        self.element.is_connected()
    }

    fn focus(&self) {
        let _ = self.element.focus();
    }
}

pub struct DomPageChrome {
    /// `overflow`/`padding-right` recorded by the first lock acquirer
    saved_styles: RefCell<Option<(String, String)>>,
    /// Landmark regions marked inert behind fully-modal surfaces
    background_selector: String,
}

impl DomPageChrome {
    pub fn new(background_selector: impl Into<String>) -> Self {
        Self {
            saved_styles: RefCell::new(None),
            background_selector: background_selector.into(),
        }
    }
}

fn restore_property(style: &CssStyleDeclaration, property: &str, value: &str) {
    if value.is_empty() {
        let _ = style.remove_property(property);
    } else {
        let _ = style.set_property(property, value);
    }
}

impl PageChrome for DomPageChrome {
    fn capture_focus(&self) -> Option<Box<dyn FocusTarget>> {
        let element = document()?.active_element()?;
        let element: HtmlElement = element.dyn_into().ok()?;
        Some(Box::new(DomFocusTarget { element }))
    }

    fn lock_scroll(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        let (Some(root), Some(body)) = (document.document_element(), document.body()) else {
            return;
        };

        // compensate the vanishing scrollbar so the layout doesn't shift
        let inner_width = window
            .inner_width()
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        let scrollbar = (inner_width - f64::from(root.client_width())).max(0.0);

        let style = body.style();
        let prior_overflow = style.get_property_value("overflow").unwrap_or_default();
        let prior_padding = style.get_property_value("padding-right").unwrap_or_default();
        *self.saved_styles.borrow_mut() = Some((prior_overflow, prior_padding));

        let _ = style.set_property("overflow", "hidden");
        if scrollbar > 0.0 {
            let _ = style.set_property("padding-right", &format!("{scrollbar}px"));
        }
    }

    fn unlock_scroll(&self) {
        let Some((overflow, padding)) = self.saved_styles.borrow_mut().take() else {
            return;
        };
        let Some(body) = document().and_then(|d| d.body()) else {
            return;
        };
        let style = body.style();
        restore_property(&style, "overflow", &overflow);
        restore_property(&style, "padding-right", &padding);
    }

    fn set_background_inert(&self, inert: bool) {
        let Some(document) = document() else {
            return;
        };
        let Ok(nodes) = document.query_selector_all(&self.background_selector) else {
            return;
        };
        for index in 0..nodes.length() {
            let Some(node) = nodes.item(index) else {
                continue;
            };
            let Ok(element) = node.dyn_into::<web_sys::Element>() else {
                continue;
            };
            if inert {
                let _ = element.set_attribute("inert", "");
            } else {
                let _ = element.remove_attribute("inert");
            }
        }
    }

    fn hash(&self) -> Option<String> {
        super::current_hash()
    }

    fn replace_hash(&self, value: Option<&str>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            return;
        };
        let location = window.location();
        let url = match value {
            Some(id) => format!("#{id}"),
            None => {
                // strip the fragment, keep path and query
                let pathname = location.pathname().unwrap_or_default();
                let search = location.search().unwrap_or_default();
                format!("{pathname}{search}")
            }
        };
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&url));
    }
}
