//! Reactive Status Surface
//!
//! Leptos-signal implementation of the orchestrator's status sink. The
//! components only ever read these signals; the orchestrator is the
//! only writer.

use std::cell::Cell;
use std::rc::Rc;

use leptos::prelude::*;

use donor_core::{StatusSink, ToastLevel};

use crate::dom;

const TOAST_DISMISS_MS: i32 = 6000;

#[derive(Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct SignalStatusSink {
    pub toasts: RwSignal<Vec<Toast>>,
    pub inline_error: RwSignal<Option<String>>,
    pub busy: RwSignal<bool>,
    pub submit_enabled: RwSignal<bool>,
    next_toast_id: Rc<Cell<u64>>,
}

impl SignalStatusSink {
    pub fn new() -> Self {
        Self {
            toasts: RwSignal::new(Vec::new()),
            inline_error: RwSignal::new(None),
            busy: RwSignal::new(false),
            submit_enabled: RwSignal::new(false),
            next_toast_id: Rc::new(Cell::new(0)),
        }
    }

    pub fn dismiss(&self, id: u64) {
        self.toasts.update(|toasts| toasts.retain(|toast| toast.id != id));
    }
}

impl Default for SignalStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for SignalStatusSink {
    fn toast(&self, level: ToastLevel, message: &str) {
        let id = self.next_toast_id.get() + 1;
        self.next_toast_id.set(id);
        self.toasts.update(|toasts| {
            toasts.push(Toast {
                id,
                level,
                message: message.into(),
            });
        });

        let sink = self.clone();
        dom::set_timeout(TOAST_DISMISS_MS, move || sink.dismiss(id));
    }

    fn inline_error(&self, message: Option<&str>) {
        self.inline_error.set(message.map(String::from));
    }

    fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.submit_enabled.set(enabled);
    }
}
