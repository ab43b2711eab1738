//! Payment Orchestrator
//!
//! Consumes Draft Store changes and Overlay Manager events to decide
//! when the provider adapters should (re)prepare a session, owns the
//! submit/confirm flow, and is the single place that decides user-visible
//! wording. It never polls: the checkout `Opened` event is its only
//! entry point.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::join_all;

use donor_core::{
    CheckoutConfig, DraftStore, OverlayManager, StatusSink, ToastLevel,
};

use crate::adapter::{ConfirmOutcome, PrepareOutcome, ProviderAdapter};
use crate::error::PaymentError;
use crate::session::{ChargeDraft, ProviderKind};
use crate::time::Sleeper;

/// Surface id of the checkout sheet, shared with the overlay wiring.
pub const CHECKOUT_SURFACE_ID: &str = "checkout";

/// Draft-changed bursts are coalesced into one evaluation.
const DEBOUNCE: Duration = Duration::from_millis(250);

const GENERIC_FAILURE: &str = "Something went wrong processing your donation. Please try again.";

/// State machine per checkout attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutPhase {
    Idle,
    Evaluating,
    Ready,
    Blocked,
    Confirming,
    Succeeded,
    Failed,
}

pub struct CheckoutOrchestrator {
    config: Rc<CheckoutConfig>,
    draft: Rc<DraftStore>,
    overlays: Rc<OverlayManager>,
    adapters: Vec<Rc<dyn ProviderAdapter>>,
    status: Rc<dyn StatusSink>,
    sleeper: Rc<dyn Sleeper>,
    phase: Cell<CheckoutPhase>,
    active: Cell<Option<ProviderKind>>,
    checkout_open: Cell<bool>,
    debounce_generation: Cell<u64>,
}

impl CheckoutOrchestrator {
    pub fn new(
        config: Rc<CheckoutConfig>,
        draft: Rc<DraftStore>,
        overlays: Rc<OverlayManager>,
        adapters: Vec<Rc<dyn ProviderAdapter>>,
        status: Rc<dyn StatusSink>,
        sleeper: Rc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            draft,
            overlays,
            adapters,
            status,
            sleeper,
            phase: Cell::new(CheckoutPhase::Idle),
            active: Cell::new(None),
            checkout_open: Cell::new(false),
            debounce_generation: Cell::new(0),
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase.get()
    }

    pub fn active_provider(&self) -> Option<ProviderKind> {
        self.active.get()
    }

    /// Wired to the overlay manager's `Opened("checkout")` event.
    pub async fn checkout_opened(&self) {
        self.checkout_open.set(true);
        self.evaluate(false).await;
    }

    /// Wired to `Closed("checkout")`. Sessions are kept; reopening with
    /// an unchanged draft reuses them without a network call.
    pub fn checkout_closed(&self) {
        self.checkout_open.set(false);
        if self.phase.get() != CheckoutPhase::Succeeded {
            self.phase.set(CheckoutPhase::Idle);
        }
        self.status.inline_error(None);
        self.status.set_busy(false);
    }

    /// Debounced re-evaluation: a burst of keystrokes becomes a single
    /// evaluation for the final value.
    pub async fn draft_changed(&self) {
        let generation = self.debounce_generation.get() + 1;
        self.debounce_generation.set(generation);
        self.sleeper.sleep(DEBOUNCE).await;
        if self.debounce_generation.get() != generation {
            return;
        }
        self.evaluate(false).await;
    }

    /// Immediate forced re-preparation (theme change, team re-selection).
    /// Cancels any pending debounce.
    pub async fn force_refresh(&self) {
        self.debounce_generation
            .set(self.debounce_generation.get() + 1);
        self.evaluate(true).await;
    }

    /// Speculative SDK warm-up on pointer/focus intent. Never creates a
    /// session and never mounts UI.
    pub async fn prewarm(&self) {
        join_all(
            self.adapters
                .iter()
                .filter(|adapter| adapter.available())
                .map(|adapter| adapter.prewarm()),
        )
        .await;
    }

    /// Gating invariant: no provider `prepare` unless the checkout
    /// surface is open and the draft passes validation.
    async fn evaluate(&self, force: bool) {
        if !self.checkout_open.get() {
            return;
        }
        self.phase.set(CheckoutPhase::Evaluating);

        if self.draft.validate().is_err() {
            // invalid-while-typing is not an error banner; the field
            // handlers surface their own hints
            self.phase.set(CheckoutPhase::Blocked);
            self.status.set_submit_enabled(false);
            self.status.inline_error(None);
            return;
        }

        let enabled: Vec<Rc<dyn ProviderAdapter>> = self
            .adapters
            .iter()
            .filter(|adapter| adapter.available())
            .cloned()
            .collect();
        if enabled.is_empty() {
            // missing configuration stays silent until the donor tries
            // to pay
            self.phase.set(CheckoutPhase::Blocked);
            self.status.set_submit_enabled(false);
            return;
        }

        let charge = self.charge_draft();
        tracing::debug!(amount_cents = charge.amount_cents, force, "evaluating checkout");

        let outcomes = join_all(
            enabled
                .iter()
                .map(|adapter| adapter.prepare(&charge, force)),
        )
        .await;

        if outcomes
            .iter()
            .all(|outcome| *outcome == PrepareOutcome::Superseded)
        {
            // a newer evaluation owns the flow
            return;
        }

        let mut ready: Option<ProviderKind> = None;
        let mut failure: Option<PaymentError> = None;
        for (adapter, outcome) in enabled.iter().zip(outcomes) {
            match outcome {
                PrepareOutcome::Ready => {
                    if ready.is_none() {
                        ready = Some(adapter.kind());
                    }
                }
                PrepareOutcome::Failed(err) => {
                    tracing::warn!(provider = %adapter.kind(), %err, "prepare failed");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
                PrepareOutcome::Unavailable | PrepareOutcome::Superseded => {}
            }
        }

        if let Some(kind) = ready {
            self.active.set(Some(kind));
            self.phase.set(CheckoutPhase::Ready);
            self.status.set_submit_enabled(true);
            self.status.inline_error(None);
        } else if let Some(err) = failure {
            self.phase.set(CheckoutPhase::Failed);
            self.status.set_submit_enabled(false);
            self.status.inline_error(Some(&err.user_message()));
        } else {
            self.phase.set(CheckoutPhase::Blocked);
            self.status.set_submit_enabled(false);
        }
    }

    /// Submit flow: synchronous re-validation, a final prepare so the
    /// mounted session matches the draft exactly, then confirm on the
    /// chosen provider.
    pub async fn submit(&self, kind: ProviderKind) {
        if self.phase.get() == CheckoutPhase::Confirming {
            return;
        }
        if let Err(err) = self.draft.validate() {
            self.status.set_submit_enabled(false);
            self.status.inline_error(Some(&err.to_string()));
            return;
        }
        let Some(adapter) = self.adapter(kind) else {
            tracing::warn!(provider = %kind, "submit for unknown provider");
            return;
        };
        if !adapter.available() {
            self.status
                .inline_error(Some("This payment method is not available right now."));
            return;
        }

        self.phase.set(CheckoutPhase::Confirming);
        self.status.set_busy(true);
        self.status.set_submit_enabled(false);
        self.status.inline_error(None);

        let charge = self.charge_draft();
        match adapter.prepare(&charge, false).await {
            PrepareOutcome::Ready => {}
            PrepareOutcome::Superseded => {
                // a newer draft owns the flow; unwind the busy state
                self.phase.set(CheckoutPhase::Evaluating);
                self.status.set_busy(false);
                return;
            }
            PrepareOutcome::Unavailable => {
                self.fail_submit("This payment method is not available right now.".into());
                return;
            }
            PrepareOutcome::Failed(err) => {
                self.fail_submit(err.user_message());
                return;
            }
        }

        match adapter.confirm(&charge).await {
            ConfirmOutcome::Succeeded => self.finish(kind, "Thank you for your donation!"),
            ConfirmOutcome::Pending => {
                self.finish(kind, "Thank you! Your donation is being finalized.");
            }
            ConfirmOutcome::Failed { message } => {
                // never a generic message if the provider supplied one
                self.fail_submit(message.unwrap_or_else(|| GENERIC_FAILURE.into()));
            }
        }
    }

    fn finish(&self, kind: ProviderKind, toast: &str) {
        tracing::info!(provider = %kind, "donation confirmed");
        self.phase.set(CheckoutPhase::Succeeded);
        self.status.set_busy(false);
        self.draft.clear();
        // close through the manager, never by touching overlay signals
        self.overlays.close(CHECKOUT_SURFACE_ID);
        self.status.toast(ToastLevel::Success, toast);
    }

    fn fail_submit(&self, message: String) {
        self.phase.set(CheckoutPhase::Failed);
        self.status.set_busy(false);
        // failure leaves the surface open and the attempt retryable
        self.status.set_submit_enabled(true);
        self.status.inline_error(Some(&message));
    }

    fn charge_draft(&self) -> ChargeDraft {
        let snapshot = self.draft.snapshot();
        let summary = self.draft.summary();
        ChargeDraft::assemble(&snapshot, &summary, &self.config.theme)
    }

    fn adapter(&self, kind: ProviderKind) -> Option<Rc<dyn ProviderAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.kind() == kind)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use async_trait::async_trait;
    use futures::FutureExt;

    use donor_core::{
        FocusTarget, MemoryStorage, PageChrome, SurfaceKind, SurfacePanel,
    };

    struct TokioSleeper;

    impl Sleeper for TokioSleeper {
        fn sleep(&self, duration: Duration) -> futures::future::LocalBoxFuture<'static, ()> {
            tokio::time::sleep(duration).boxed_local()
        }
    }

    struct NoopPanel;

    impl SurfacePanel for NoopPanel {
        fn apply_open_signals(&self, _open: bool) {}
        fn focus_initial(&self) {}
    }

    struct NoopChrome {
        hash: RefCell<Option<String>>,
    }

    impl PageChrome for NoopChrome {
        fn capture_focus(&self) -> Option<Box<dyn FocusTarget>> {
            None
        }
        fn lock_scroll(&self) {}
        fn unlock_scroll(&self) {}
        fn set_background_inert(&self, _inert: bool) {}
        fn hash(&self) -> Option<String> {
            self.hash.borrow().clone()
        }
        fn replace_hash(&self, value: Option<&str>) {
            *self.hash.borrow_mut() = value.map(String::from);
        }
    }

    struct FakeAdapter {
        kind: ProviderKind,
        available: Cell<bool>,
        prepares: RefCell<Vec<(i64, bool)>>,
        prepare_outcome: RefCell<PrepareOutcome>,
        confirms: Cell<u32>,
        confirm_outcome: RefCell<ConfirmOutcome>,
        prewarms: Cell<u32>,
    }

    impl FakeAdapter {
        fn new(kind: ProviderKind) -> Rc<Self> {
            Rc::new(Self {
                kind,
                available: Cell::new(true),
                prepares: RefCell::new(Vec::new()),
                prepare_outcome: RefCell::new(PrepareOutcome::Ready),
                confirms: Cell::new(0),
                confirm_outcome: RefCell::new(ConfirmOutcome::Succeeded),
                prewarms: Cell::new(0),
            })
        }
    }

    #[async_trait(?Send)]
    impl ProviderAdapter for FakeAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn available(&self) -> bool {
            self.available.get()
        }

        async fn prewarm(&self) {
            self.prewarms.set(self.prewarms.get() + 1);
        }

        async fn prepare(&self, draft: &ChargeDraft, force: bool) -> PrepareOutcome {
            self.prepares.borrow_mut().push((draft.amount_cents, force));
            self.prepare_outcome.borrow().clone()
        }

        fn teardown(&self) {}

        async fn confirm(&self, _draft: &ChargeDraft) -> ConfirmOutcome {
            self.confirms.set(self.confirms.get() + 1);
            self.confirm_outcome.borrow().clone()
        }

        fn session_status(&self) -> crate::session::SessionStatus {
            crate::session::SessionStatus::None
        }
    }

    struct RecordingSink {
        toasts: RefCell<Vec<(ToastLevel, String)>>,
        inline: RefCell<Option<String>>,
        busy: Cell<bool>,
        submit_enabled: Cell<bool>,
    }

    impl RecordingSink {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                toasts: RefCell::new(Vec::new()),
                inline: RefCell::new(None),
                busy: Cell::new(false),
                submit_enabled: Cell::new(false),
            })
        }
    }

    impl StatusSink for RecordingSink {
        fn toast(&self, level: ToastLevel, message: &str) {
            self.toasts.borrow_mut().push((level, message.into()));
        }

        fn inline_error(&self, message: Option<&str>) {
            *self.inline.borrow_mut() = message.map(String::from);
        }

        fn set_busy(&self, busy: bool) {
            self.busy.set(busy);
        }

        fn set_submit_enabled(&self, enabled: bool) {
            self.submit_enabled.set(enabled);
        }
    }

    struct Harness {
        orchestrator: CheckoutOrchestrator,
        draft: Rc<DraftStore>,
        overlays: Rc<OverlayManager>,
        stripe: Rc<FakeAdapter>,
        paypal: Rc<FakeAdapter>,
        sink: Rc<RecordingSink>,
    }

    fn harness() -> Harness {
        let config = Rc::new(
            CheckoutConfig::from_json(
                r#"{"stripe_public_key":"pk_test_1","paypal_client_id":"client-1"}"#,
            )
            .unwrap(),
        );
        let draft = Rc::new(DraftStore::new(
            config.clone(),
            Rc::new(MemoryStorage::new()),
            Rc::new(MemoryStorage::new()),
        ));
        let overlays = Rc::new(OverlayManager::new(Rc::new(NoopChrome {
            hash: RefCell::new(None),
        })));
        overlays.register(
            CHECKOUT_SURFACE_ID,
            Rc::new(NoopPanel),
            SurfaceKind::Checkout,
            true,
        );

        let stripe = FakeAdapter::new(ProviderKind::Stripe);
        let paypal = FakeAdapter::new(ProviderKind::Paypal);
        let sink = RecordingSink::new();

        let orchestrator = CheckoutOrchestrator::new(
            config,
            draft.clone(),
            overlays.clone(),
            vec![stripe.clone(), paypal.clone()],
            sink.clone(),
            Rc::new(TokioSleeper),
        );

        Harness {
            orchestrator,
            draft,
            overlays,
            stripe,
            paypal,
            sink,
        }
    }

    /// Open the surface and notify the orchestrator, as the wiring does.
    async fn open_checkout(h: &Harness) {
        h.overlays.open(CHECKOUT_SURFACE_ID);
        h.orchestrator.checkout_opened().await;
    }

    #[tokio::test]
    async fn test_open_with_valid_draft_prepares_each_enabled_provider() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");

        open_checkout(&h).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Ready);
        assert_eq!(h.stripe.prepares.borrow().as_slice(), &[(2500, false)]);
        assert_eq!(h.paypal.prepares.borrow().as_slice(), &[(2500, false)]);
        assert!(h.sink.submit_enabled.get());
        assert_eq!(h.orchestrator.active_provider(), Some(ProviderKind::Stripe));
    }

    #[tokio::test]
    async fn test_zero_amount_blocks_without_network() {
        let h = harness();
        h.draft.set_donor_email("donor@example.com");

        open_checkout(&h).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Blocked);
        assert!(h.stripe.prepares.borrow().is_empty());
        assert!(h.paypal.prepares.borrow().is_empty());
        assert!(!h.sink.submit_enabled.get());
    }

    #[tokio::test]
    async fn test_invalid_email_blocks_without_network() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("not-an-email");

        open_checkout(&h).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Blocked);
        assert!(h.stripe.prepares.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_closed_surface_never_prepares() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");

        h.orchestrator.draft_changed().await;

        assert!(h.stripe.prepares.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_keystrokes() {
        let h = harness();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await; // amount still zero: blocked, no prepare

        h.draft.set_amount_input("10").unwrap();
        let type_more = async {
            h.draft.set_amount_input("100").unwrap();
            h.orchestrator.draft_changed().await;
        };
        futures::join!(h.orchestrator.draft_changed(), type_more);

        // one evaluation, for the final value
        assert_eq!(h.stripe.prepares.borrow().as_slice(), &[(10_000, false)]);
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped_silently() {
        let h = harness();
        h.paypal.available.set(false);
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");

        open_checkout(&h).await;

        assert_eq!(h.stripe.prepares.borrow().len(), 1);
        assert!(h.paypal.prepares.borrow().is_empty());
        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Ready);
        assert!(h.sink.inline.borrow().is_none());
    }

    #[tokio::test]
    async fn test_prepare_failure_surfaces_wording_once() {
        let h = harness();
        h.paypal.available.set(false);
        *h.stripe.prepare_outcome.borrow_mut() =
            PrepareOutcome::Failed(PaymentError::Provider("Amount too small.".into()));
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");

        open_checkout(&h).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Failed);
        assert_eq!(h.sink.inline.borrow().as_deref(), Some("Amount too small."));
        assert!(!h.sink.submit_enabled.get());
    }

    #[tokio::test]
    async fn test_submit_success_clears_draft_and_closes_surface() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await;

        h.orchestrator.submit(ProviderKind::Stripe).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Succeeded);
        assert_eq!(h.draft.amount_cents(), 0);
        assert!(!h.overlays.is_open(CHECKOUT_SURFACE_ID));
        assert!(!h.sink.busy.get());
        let toasts = h.sink.toasts.borrow();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].0, ToastLevel::Success);
        // final prepare before confirm: two prepares total
        assert_eq!(h.stripe.prepares.borrow().len(), 2);
        assert_eq!(h.stripe.confirms.get(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_surface_open_with_verbatim_message() {
        let h = harness();
        *h.stripe.confirm_outcome.borrow_mut() = ConfirmOutcome::Failed {
            message: Some("Your card was declined.".into()),
        };
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await;

        h.orchestrator.submit(ProviderKind::Stripe).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Failed);
        assert!(h.overlays.is_open(CHECKOUT_SURFACE_ID));
        assert_eq!(
            h.sink.inline.borrow().as_deref(),
            Some("Your card was declined.")
        );
        assert!(h.sink.submit_enabled.get());
        assert!(!h.sink.busy.get());
        // the draft survives for a retry
        assert_eq!(h.draft.amount_cents(), 2500);
    }

    #[tokio::test]
    async fn test_submit_failure_without_message_uses_fallback() {
        let h = harness();
        *h.stripe.confirm_outcome.borrow_mut() = ConfirmOutcome::Failed { message: None };
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await;

        h.orchestrator.submit(ProviderKind::Stripe).await;

        assert_eq!(h.sink.inline.borrow().as_deref(), Some(GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn test_pending_confirmation_counts_as_success() {
        let h = harness();
        *h.stripe.confirm_outcome.borrow_mut() = ConfirmOutcome::Pending;
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await;

        h.orchestrator.submit(ProviderKind::Stripe).await;

        assert_eq!(h.orchestrator.phase(), CheckoutPhase::Succeeded);
        assert!(!h.overlays.is_open(CHECKOUT_SURFACE_ID));
    }

    #[tokio::test]
    async fn test_prewarm_loads_scripts_but_never_prepares() {
        let h = harness();
        h.orchestrator.prewarm().await;

        assert_eq!(h.stripe.prewarms.get(), 1);
        assert_eq!(h.paypal.prewarms.get(), 1);
        assert!(h.stripe.prepares.borrow().is_empty());
        assert!(h.paypal.prepares.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_memoization() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        open_checkout(&h).await;

        h.orchestrator.force_refresh().await;

        let prepares = h.stripe.prepares.borrow();
        assert_eq!(prepares.as_slice(), &[(2500, false), (2500, true)]);
    }

    #[tokio::test]
    async fn test_fee_cover_feeds_billed_total() {
        let h = harness();
        h.draft.set_amount_input("25").unwrap();
        h.draft.set_donor_email("donor@example.com");
        h.draft.set_cover_fees(true);
        open_checkout(&h).await;

        let billed = h.stripe.prepares.borrow()[0].0;
        assert_eq!(billed, 2500 + h.draft.summary().fee_cover_cents);
        assert!(billed > 2500);
    }
}
