//! DOM Utilities & Seam Implementations
//!
//! Everything that touches `web-sys` directly lives under this module.
//! The engine crates only ever see the traits these types implement.

pub mod chrome;
pub mod focus;
pub mod panel;
pub mod scripts;
pub mod storage;
pub mod timers;

pub use chrome::DomPageChrome;
pub use focus::FocusTrap;
pub use panel::DomSurfacePanel;
pub use scripts::DomScriptHost;
pub use storage::WebKeyValueStorage;
pub use timers::DomSleeper;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

pub fn document() -> Option<Document> {
    web_sys::window()?.document()
}

pub fn element_by_id(id: &str) -> Option<Element> {
    document()?.get_element_by_id(id)
}

/// Current location hash without the leading `#`; `None` when empty.
pub fn current_hash() -> Option<String> {
    let hash = web_sys::window()?.location().hash().ok()?;
    let hash = hash.trim_start_matches('#');
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}

/// Run `f` on the next animation frame.
pub fn request_animation_frame(f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once_into_js(f);
    let _ = window.request_animation_frame(closure.unchecked_ref());
}

/// Run `f` after `ms` milliseconds.
pub fn set_timeout(ms: i32, f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once_into_js(f);
    let _ = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(closure.unchecked_ref(), ms);
}

const FOCUSABLE_SELECTOR: &str = "a[href], button, input, select, textarea, [tabindex]";

/// The tabbable set inside `root`: visible, not disabled, not
/// aria-hidden, not opted out with `tabindex="-1"`.
pub fn focusable_elements(root: &Element) -> Vec<HtmlElement> {
    let Ok(nodes) = root.query_selector_all(FOCUSABLE_SELECTOR) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for index in 0..nodes.length() {
        let Some(node) = nodes.item(index) else {
            continue;
        };
        let Ok(element) = node.dyn_into::<HtmlElement>() else {
            continue;
        };
        if element.has_attribute("disabled") {
            continue;
        }
        if element.get_attribute("aria-hidden").as_deref() == Some("true") {
            continue;
        }
        if element.get_attribute("tabindex").as_deref() == Some("-1") {
            continue;
        }
        // offsetParent is null for display:none subtrees
        if element.offset_parent().is_none() {
            continue;
        }
        out.push(element);
    }
    out
}

/// Whether the active element sits inside the surface root.
pub fn focus_within(surface_id: &str) -> bool {
    let Some(root) = element_by_id(surface_id) else {
        return false;
    };
    let Some(active) = document().and_then(|d| d.active_element()) else {
        return false;
    };
    root.contains(Some(active.unchecked_ref()))
}

/// Focus the inner panel itself (it carries `tabindex="-1"`).
pub fn focus_panel(surface_id: &str) {
    let Some(root) = element_by_id(surface_id) else {
        return;
    };
    let panel = root
        .query_selector(".overlay-panel")
        .ok()
        .flatten()
        .and_then(|element| element.dyn_into::<HtmlElement>().ok());
    if let Some(panel) = panel {
        let _ = panel.focus();
    }
}
