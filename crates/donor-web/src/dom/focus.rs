//! Focus Trap
//!
//! One delegated `keydown` listener per currently-open surface cycles
//! Tab/Shift+Tab through the focusable set and routes Escape to the
//! overlay manager (which gives the checkout surface priority). A
//! `focusin` listener drags focus back inside when something outside the
//! panel steals it — third-party SDK iframes are the usual culprit.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Element;

use donor_core::OverlayManager;

use super::{document, element_by_id, focus_panel, focusable_elements};

#[derive(Default)]
pub struct FocusTrap {
    keydown: RefCell<Option<Closure<dyn FnMut(web_sys::KeyboardEvent)>>>,
    focusin: RefCell<Option<Closure<dyn FnMut(web_sys::FocusEvent)>>>,
}

impl FocusTrap {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Arm the trap for `surface_id`, replacing any previous trap.
    pub fn install(&self, surface_id: &str, overlays: Rc<OverlayManager>) {
        self.release();
        let Some(document) = document() else {
            return;
        };

        let trap_id = surface_id.to_string();
        let keydown = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(
            move |event: web_sys::KeyboardEvent| match event.key().as_str() {
                "Escape" => {
                    event.prevent_default();
                    overlays.escape_pressed();
                }
                "Tab" => cycle_tab(&trap_id, &event),
                _ => {}
            },
        );
        let _ = document
            .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref());
        *self.keydown.borrow_mut() = Some(keydown);

        let trap_id = surface_id.to_string();
        let focusin = Closure::<dyn FnMut(web_sys::FocusEvent)>::new(
            move |event: web_sys::FocusEvent| {
                let Some(root) = element_by_id(&trap_id) else {
                    return;
                };
                let target = event
                    .target()
                    .and_then(|target| target.dyn_into::<web_sys::Node>().ok());
                let Some(target) = target else {
                    return;
                };
                if !root.contains(Some(&target)) {
                    focus_panel(&trap_id);
                }
            },
        );
        let _ = document
            .add_event_listener_with_callback("focusin", focusin.as_ref().unchecked_ref());
        *self.focusin.borrow_mut() = Some(focusin);
    }

    /// Remove the listeners. Safe to call when nothing is armed.
    pub fn release(&self) {
        let Some(document) = document() else {
            return;
        };
        if let Some(closure) = self.keydown.borrow_mut().take() {
            let _ = document
                .remove_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        }
        if let Some(closure) = self.focusin.borrow_mut().take() {
            let _ = document
                .remove_event_listener_with_callback("focusin", closure.as_ref().unchecked_ref());
        }
    }
}

/// Wrap Tab/Shift+Tab at the edges of the focusable set.
fn cycle_tab(surface_id: &str, event: &web_sys::KeyboardEvent) {
    let Some(root) = element_by_id(surface_id) else {
        return;
    };
    let focusable = focusable_elements(&root);
    let (Some(first), Some(last)) = (focusable.first(), focusable.last()) else {
        event.prevent_default();
        return;
    };

    let active = document().and_then(|d| d.active_element());
    let first_element: &Element = first.as_ref();
    let last_element: &Element = last.as_ref();

    if event.shift_key() {
        if active.as_ref() == Some(first_element) || active.is_none() {
            event.prevent_default();
            let _ = last.focus();
        }
    } else if active.as_ref() == Some(last_element) || active.is_none() {
        event.prevent_default();
        let _ = first.focus();
    }
}
