//! Surface Panels
//!
//! Render output for one overlay surface. The typed overlay state drives
//! three redundant signals here — the `hidden` attribute (structural),
//! `aria-hidden` (accessibility), and the `is-open` class
//! (presentational) — and all three are forced on every transition, so a
//! prior inconsistency can never survive a close.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::Element;

use donor_core::SurfacePanel;

use super::{element_by_id, focus_panel, focus_within, focusable_elements};

pub struct DomSurfacePanel {
    surface_id: String,
}

impl DomSurfacePanel {
    pub fn new(surface_id: &str) -> Rc<Self> {
        Rc::new(Self {
            surface_id: surface_id.into(),
        })
    }

    fn root(&self) -> Option<Element> {
        element_by_id(&self.surface_id)
    }
}

impl SurfacePanel for DomSurfacePanel {
    fn apply_open_signals(&self, open: bool) {
        let Some(root) = self.root() else {
            return;
        };
        if open {
            let _ = root.remove_attribute("hidden");
            let _ = root.set_attribute("aria-hidden", "false");
            let _ = root.class_list().add_1("is-open");
        } else {
            let _ = root.set_attribute("hidden", "");
            let _ = root.set_attribute("aria-hidden", "true");
            let _ = root.class_list().remove_1("is-open");
        }
    }

    fn focus_initial(&self) {
        let surface_id = self.surface_id.clone();
        super::request_animation_frame(move || {
            focus_first(&surface_id);
            // some browsers fight early focus calls; re-check shortly
            // after and fall back to the panel itself
            let recheck_id = surface_id.clone();
            super::set_timeout(150, move || {
                if !focus_within(&recheck_id) {
                    focus_panel(&recheck_id);
                }
            });
        });
    }
}

/// Prefer a close control, then the first meaningful input, then the
/// panel itself.
fn focus_first(surface_id: &str) {
    let Some(root) = element_by_id(surface_id) else {
        return;
    };

    let close_control = root
        .query_selector("[data-overlay-close]")
        .ok()
        .flatten()
        .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());
    if let Some(control) = close_control {
        let _ = control.focus();
        if focus_within(surface_id) {
            return;
        }
    }

    let first_input = focusable_elements(&root)
        .into_iter()
        .find(|element| matches!(element.tag_name().as_str(), "INPUT" | "SELECT" | "TEXTAREA"));
    if let Some(input) = first_input {
        let _ = input.focus();
        if focus_within(surface_id) {
            return;
        }
    }

    focus_panel(surface_id);
}
