//! Notification/Status Surface
//!
//! A passive sink the orchestrator writes to. The frontend backs this
//! with reactive signals; tests use a recording fake.

/// Toast severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// Sink for user-visible checkout status.
///
/// The orchestrator is the only writer; implementations must not call
/// back into the engine.
pub trait StatusSink {
    /// Transient toast message.
    fn toast(&self, level: ToastLevel, message: &str);

    /// Inline error region inside the checkout sheet; `None` clears it.
    fn inline_error(&self, message: Option<&str>);

    /// Submit control busy state (spinner/label swap).
    fn set_busy(&self, busy: bool);

    /// Whether the submit control accepts clicks.
    fn set_submit_enabled(&self, enabled: bool);
}

/// No-op sink for headless use.
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn toast(&self, _level: ToastLevel, _message: &str) {}
    fn inline_error(&self, _message: Option<&str>) {}
    fn set_busy(&self, _busy: bool) {}
    fn set_submit_enabled(&self, _enabled: bool) {}
}
