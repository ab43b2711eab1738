//! Overlay Manager
//!
//! A deterministic open/close state machine for modal-like surfaces
//! (checkout sheet, drawers, secondary modals). The typed state here is
//! the source of truth; DOM attributes are outputs of the render seam
//! ([`SurfacePanel`]), never inputs read back to decide a transition.
//!
//! No knowledge of payments. The orchestrator subscribes to
//! [`OverlayEvent`]s instead of polling.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Checkout gets priority ownership of Escape/backdrop while open and is
/// exempt from the mutual-exclusion rule auxiliary surfaces follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Checkout,
    Auxiliary,
}

/// Lifecycle notifications. `Opened` is the only sanctioned signal the
/// payment orchestrator acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayEvent {
    Opened(String),
    Closed(String),
}

/// A captured focus position that can be restored later, if the element
/// is still attached to the document.
pub trait FocusTarget {
    fn is_connected(&self) -> bool;
    fn focus(&self);
}

/// Per-surface render output.
pub trait SurfacePanel {
    /// Drive all three redundant open signals at once: the structural
    /// attribute, the accessibility attribute, and the presentational
    /// class. Closing must force all three closed even if a prior bug
    /// left them inconsistent.
    fn apply_open_signals(&self, open: bool);

    /// Move focus into the panel on the next frame, preferring a close
    /// control, then the first meaningful input, then the panel itself;
    /// re-check after a short delay in case the first attempt lost.
    fn focus_initial(&self);
}

/// Page-global effects: focus capture, the scroll lock, background
/// inertness, and the URL hash.
pub trait PageChrome {
    fn capture_focus(&self) -> Option<Box<dyn FocusTarget>>;

    /// First acquirer records prior `overflow`/`padding-right` and
    /// compensates scrollbar width to avoid layout shift.
    fn lock_scroll(&self);
    fn unlock_scroll(&self);

    fn set_background_inert(&self, inert: bool);

    /// Current hash without the leading `#`, or `None`.
    fn hash(&self) -> Option<String>;

    /// History-replace the hash without a scroll jump; `None` clears it.
    fn replace_hash(&self, value: Option<&str>);
}

struct Surface {
    panel: Rc<dyn SurfacePanel>,
    kind: SurfaceKind,
    modal: bool,
    open: bool,
    return_focus: Option<Box<dyn FocusTarget>>,
}

/// Open/close state machine for every registered surface.
///
/// Sole owner of the ref-counted scroll lock. Surfaces are registered
/// once when they first exist in the document and never destroyed while
/// the page lives.
pub struct OverlayManager {
    chrome: Rc<dyn PageChrome>,
    surfaces: RefCell<HashMap<String, Surface>>,
    open_order: RefCell<Vec<String>>,
    scroll_locks: Cell<usize>,
    listeners: RefCell<Vec<Box<dyn Fn(&OverlayEvent)>>>,
}

impl OverlayManager {
    pub fn new(chrome: Rc<dyn PageChrome>) -> Self {
        Self {
            chrome,
            surfaces: RefCell::new(HashMap::new()),
            open_order: RefCell::new(Vec::new()),
            scroll_locks: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn register(&self, id: &str, panel: Rc<dyn SurfacePanel>, kind: SurfaceKind, modal: bool) {
        let previous = self.surfaces.borrow_mut().insert(
            id.into(),
            Surface {
                panel,
                kind,
                modal,
                open: false,
                return_focus: None,
            },
        );
        if previous.is_some() {
            tracing::warn!(surface = id, "surface re-registered");
        }
    }

    pub fn subscribe(&self, listener: Box<dyn Fn(&OverlayEvent)>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.surfaces.borrow().get(id).is_some_and(|s| s.open)
    }

    /// Idempotent open. Captures the focus return target before any
    /// render mutation, applies the three open signals, acquires the
    /// scroll lock, inerts the background for modal surfaces, schedules
    /// initial focus, and syncs the URL hash.
    pub fn open(&self, id: &str) {
        let (kind, to_close) = {
            let surfaces = self.surfaces.borrow();
            let Some(surface) = surfaces.get(id) else {
                tracing::warn!(surface = id, "open on unregistered surface");
                return;
            };
            if surface.open {
                return;
            }
            // Auxiliary surfaces exclude each other; the checkout surface
            // is never implicitly closed, and never implicitly closes.
            let to_close: Vec<String> = if surface.kind == SurfaceKind::Auxiliary {
                surfaces
                    .iter()
                    .filter(|(other, s)| {
                        s.open && s.kind == SurfaceKind::Auxiliary && other.as_str() != id
                    })
                    .map(|(other, _)| other.clone())
                    .collect()
            } else {
                Vec::new()
            };
            (surface.kind, to_close)
        };

        let return_focus = self.chrome.capture_focus();

        for other in &to_close {
            self.close(other);
        }

        let (panel, modal) = {
            let mut surfaces = self.surfaces.borrow_mut();
            let Some(surface) = surfaces.get_mut(id) else {
                return;
            };
            surface.open = true;
            surface.return_focus = return_focus;
            (surface.panel.clone(), surface.modal)
        };

        panel.apply_open_signals(true);

        let locks = self.scroll_locks.get();
        self.scroll_locks.set(locks + 1);
        if locks == 0 {
            self.chrome.lock_scroll();
        }
        if modal {
            self.chrome.set_background_inert(true);
        }
        panel.focus_initial();

        self.open_order.borrow_mut().push(id.to_string());
        self.chrome.replace_hash(Some(id));

        tracing::debug!(surface = id, kind = ?kind, "surface opened");
        self.emit(&OverlayEvent::Opened(id.into()));
    }

    /// Idempotent close-by-contract: the three closed signals are
    /// re-asserted unconditionally, even when this surface already
    /// believed it was closed, because multiple triggers (Escape,
    /// backdrop, success path, hash change) can race.
    pub fn close(&self, id: &str) {
        let (panel, was_open) = {
            let mut surfaces = self.surfaces.borrow_mut();
            let Some(surface) = surfaces.get_mut(id) else {
                tracing::warn!(surface = id, "close on unregistered surface");
                return;
            };
            let panel = surface.panel.clone();
            if surface.open {
                surface.open = false;
                (panel, Some((surface.modal, surface.return_focus.take())))
            } else {
                (panel, None)
            }
        };

        panel.apply_open_signals(false);
        let Some((modal, return_focus)) = was_open else {
            return;
        };

        let locks = self.scroll_locks.get();
        if locks > 0 {
            self.scroll_locks.set(locks - 1);
            if locks == 1 {
                self.chrome.unlock_scroll();
            }
        }

        if modal {
            let any_modal_open = self.surfaces.borrow().values().any(|s| s.open && s.modal);
            if !any_modal_open {
                self.chrome.set_background_inert(false);
            }
        }

        if let Some(target) = return_focus {
            if target.is_connected() {
                target.focus();
            }
        }

        self.open_order.borrow_mut().retain(|open_id| open_id != id);
        // Never clobber a hash someone else set in the interim.
        if self.chrome.hash().as_deref() == Some(id) {
            self.chrome.replace_hash(None);
        }
        tracing::debug!(surface = id, "surface closed");
        self.emit(&OverlayEvent::Closed(id.into()));
    }

    /// Escape routing: the checkout surface owns Escape while open;
    /// otherwise the most recently opened auxiliary surface closes.
    pub fn escape_pressed(&self) {
        if let Some(id) = self.open_checkout_id() {
            self.close(&id);
            return;
        }
        let last = self.open_order.borrow().last().cloned();
        if let Some(id) = last {
            self.close(&id);
        }
    }

    /// A click is "outside" when its target is the backdrop or the
    /// surface root but not the inner panel; the caller has already made
    /// that distinction.
    pub fn outside_click(&self, id: &str) {
        if self.is_open(id) {
            self.close(id);
        }
    }

    /// The URL hash is the single source of truth for which overlay is
    /// open on reload and back/forward navigation.
    pub fn sync_from_hash(&self, hash: Option<&str>) {
        let target = hash.filter(|h| !h.is_empty());

        let open_ids: Vec<String> = {
            let surfaces = self.surfaces.borrow();
            surfaces
                .iter()
                .filter(|(id, s)| s.open && Some(id.as_str()) != target)
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in open_ids {
            self.close(&id);
        }

        if let Some(id) = target {
            let registered = self.surfaces.borrow().contains_key(id);
            if registered && !self.is_open(id) {
                self.open(id);
            }
        }
    }

    fn open_checkout_id(&self) -> Option<String> {
        self.surfaces
            .borrow()
            .iter()
            .find(|(_, s)| s.open && s.kind == SurfaceKind::Checkout)
            .map(|(id, _)| id.clone())
    }

    fn emit(&self, event: &OverlayEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every signal application so tests can assert the three
    /// redundant signals stay consistent.
    struct FakePanel {
        signals: RefCell<Vec<bool>>,
        focused: Cell<u32>,
    }

    impl FakePanel {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                signals: RefCell::new(Vec::new()),
                focused: Cell::new(0),
            })
        }

        fn last_signal(&self) -> Option<bool> {
            self.signals.borrow().last().copied()
        }
    }

    impl SurfacePanel for FakePanel {
        fn apply_open_signals(&self, open: bool) {
            self.signals.borrow_mut().push(open);
        }

        fn focus_initial(&self) {
            self.focused.set(self.focused.get() + 1);
        }
    }

    #[derive(Default)]
    struct ChromeLog {
        scroll_locked: Cell<bool>,
        lock_calls: Cell<u32>,
        unlock_calls: Cell<u32>,
        inert: Cell<bool>,
        hash: RefCell<Option<String>>,
        restored: Cell<u32>,
        capture_connected: Cell<bool>,
    }

    impl ChromeLog {
        fn replace_hash_raw(&self, value: &str) {
            *self.hash.borrow_mut() = Some(value.into());
        }
    }

    struct FakeChrome {
        log: Rc<ChromeLog>,
    }

    struct FakeFocusTarget {
        log: Rc<ChromeLog>,
        connected: bool,
    }

    impl FocusTarget for FakeFocusTarget {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn focus(&self) {
            self.log.restored.set(self.log.restored.get() + 1);
        }
    }

    impl PageChrome for FakeChrome {
        fn capture_focus(&self) -> Option<Box<dyn FocusTarget>> {
            Some(Box::new(FakeFocusTarget {
                log: self.log.clone(),
                connected: self.log.capture_connected.get(),
            }))
        }

        fn lock_scroll(&self) {
            self.log.scroll_locked.set(true);
            self.log.lock_calls.set(self.log.lock_calls.get() + 1);
        }

        fn unlock_scroll(&self) {
            self.log.scroll_locked.set(false);
            self.log.unlock_calls.set(self.log.unlock_calls.get() + 1);
        }

        fn set_background_inert(&self, inert: bool) {
            self.log.inert.set(inert);
        }

        fn hash(&self) -> Option<String> {
            self.log.hash.borrow().clone()
        }

        fn replace_hash(&self, value: Option<&str>) {
            *self.log.hash.borrow_mut() = value.map(String::from);
        }
    }

    fn manager() -> (OverlayManager, Rc<ChromeLog>) {
        let log = Rc::new(ChromeLog::default());
        log.capture_connected.set(true);
        let manager = OverlayManager::new(Rc::new(FakeChrome { log: log.clone() }));
        (manager, log)
    }

    #[test]
    fn test_open_close_round_trip() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel.clone(), SurfaceKind::Checkout, true);

        manager.open("checkout");
        assert!(manager.is_open("checkout"));
        assert_eq!(panel.last_signal(), Some(true));
        assert!(log.scroll_locked.get());
        assert!(log.inert.get());
        assert_eq!(panel.focused.get(), 1);
        assert_eq!(log.hash.borrow().as_deref(), Some("checkout"));

        manager.close("checkout");
        assert!(!manager.is_open("checkout"));
        assert_eq!(panel.last_signal(), Some(false));
        assert!(!log.scroll_locked.get());
        assert!(!log.inert.get());
        assert_eq!(log.restored.get(), 1);
        assert!(log.hash.borrow().is_none());
    }

    #[test]
    fn test_open_is_idempotent() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel.clone(), SurfaceKind::Checkout, true);

        manager.open("checkout");
        manager.open("checkout");
        manager.open("checkout");

        assert_eq!(log.lock_calls.get(), 1);
        assert_eq!(panel.signals.borrow().len(), 1);

        // a single close fully unwinds: the count cannot drift upward
        manager.close("checkout");
        assert!(!log.scroll_locked.get());
        assert_eq!(log.unlock_calls.get(), 1);
    }

    #[test]
    fn test_close_by_contract_reasserts_signals() {
        let (manager, _) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel.clone(), SurfaceKind::Checkout, true);

        // closed twice while already closed: signals forced closed each
        // time, scroll lock untouched
        manager.close("checkout");
        manager.close("checkout");
        assert_eq!(panel.signals.borrow().as_slice(), &[false, false]);
    }

    #[test]
    fn test_scroll_lock_never_negative() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel, SurfaceKind::Checkout, true);

        manager.close("checkout");
        manager.close("checkout");
        manager.open("checkout");
        manager.close("checkout");
        manager.close("checkout");

        assert_eq!(manager.scroll_locks.get(), 0);
        assert_eq!(log.unlock_calls.get(), 1);
    }

    #[test]
    fn test_back_to_back_open_close_unwinds() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel.clone(), SurfaceKind::Checkout, true);

        manager.open("checkout");
        manager.close("checkout");
        manager.open("checkout");
        manager.close("checkout");

        assert_eq!(log.lock_calls.get(), 2);
        assert_eq!(log.unlock_calls.get(), 2);
        assert!(!log.scroll_locked.get());
        assert_eq!(panel.signals.borrow().as_slice(), &[true, false, true, false]);
    }

    #[test]
    fn test_auxiliary_surfaces_exclude_each_other() {
        let (manager, _) = manager();
        manager.register("drawer", FakePanel::new(), SurfaceKind::Auxiliary, false);
        manager.register("share", FakePanel::new(), SurfaceKind::Auxiliary, false);
        manager.register("checkout", FakePanel::new(), SurfaceKind::Checkout, true);

        manager.open("checkout");
        manager.open("drawer");
        manager.open("share");

        // share displaced drawer, but never the checkout surface
        assert!(!manager.is_open("drawer"));
        assert!(manager.is_open("share"));
        assert!(manager.is_open("checkout"));

        // and opening checkout closes nothing
        manager.close("checkout");
        manager.open("checkout");
        assert!(manager.is_open("share"));
    }

    #[test]
    fn test_escape_prefers_checkout() {
        let (manager, _) = manager();
        manager.register("drawer", FakePanel::new(), SurfaceKind::Auxiliary, false);
        manager.register("checkout", FakePanel::new(), SurfaceKind::Checkout, true);

        manager.open("drawer");
        manager.open("checkout");

        manager.escape_pressed();
        assert!(!manager.is_open("checkout"));
        assert!(manager.is_open("drawer"));

        manager.escape_pressed();
        assert!(!manager.is_open("drawer"));

        // no-op with nothing open
        manager.escape_pressed();
    }

    #[test]
    fn test_focus_not_restored_when_detached() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel, SurfaceKind::Checkout, true);

        log.capture_connected.set(false);
        manager.open("checkout");
        manager.close("checkout");
        assert_eq!(log.restored.get(), 0);
    }

    #[test]
    fn test_close_leaves_foreign_hash_alone() {
        let (manager, log) = manager();
        let panel = FakePanel::new();
        manager.register("checkout", panel, SurfaceKind::Checkout, true);

        manager.open("checkout");
        // something else navigated the hash in the interim
        log.replace_hash_raw("section-2");
        manager.close("checkout");
        assert_eq!(log.hash.borrow().as_deref(), Some("section-2"));
    }

    #[test]
    fn test_sync_from_hash_opens_and_closes() {
        let (manager, _) = manager();
        manager.register("drawer", FakePanel::new(), SurfaceKind::Auxiliary, false);
        manager.register("checkout", FakePanel::new(), SurfaceKind::Checkout, true);

        manager.sync_from_hash(Some("checkout"));
        assert!(manager.is_open("checkout"));

        // back-navigation to the drawer hash
        manager.sync_from_hash(Some("drawer"));
        assert!(manager.is_open("drawer"));
        assert!(!manager.is_open("checkout"));

        // absence means no overlay open
        manager.sync_from_hash(None);
        assert!(!manager.is_open("drawer"));

        // unknown hashes are not overlays
        manager.sync_from_hash(Some("faq"));
        assert!(!manager.is_open("drawer"));
        assert!(!manager.is_open("checkout"));
    }

    #[test]
    fn test_opened_event_fires_once() {
        let (manager, _) = manager();
        manager.register("checkout", FakePanel::new(), SurfaceKind::Checkout, true);

        let events: Rc<RefCell<Vec<OverlayEvent>>> = Rc::default();
        let sink = events.clone();
        manager.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));

        manager.open("checkout");
        manager.open("checkout");
        manager.close("checkout");
        manager.close("checkout");

        assert_eq!(
            events.borrow().as_slice(),
            &[
                OverlayEvent::Opened("checkout".into()),
                OverlayEvent::Closed("checkout".into()),
            ]
        );
    }
}
