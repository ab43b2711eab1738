//! App Wiring
//!
//! Builds the engine (stores, manager, adapters, orchestrator) and wires
//! the DOM-dependent pieces after the first render: surface
//! registration, the focus trap, hashchange synchronization, and the
//! wallet approval hook.

use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use donor_core::{
    CheckoutConfig, DraftStore, DraftSummary, KeyValueStorage, OverlayEvent, OverlayManager,
    SurfaceKind,
};
use donor_payments::{
    load_or_create_seed, CheckoutApi, CheckoutBackend, CheckoutOrchestrator, PaypalAdapter,
    ProviderAdapter, ProviderKind, ScriptLoader, Sleeper, StripeAdapter, CHECKOUT_SURFACE_ID,
};

use crate::dom::{
    DomPageChrome, DomScriptHost, DomSleeper, DomSurfacePanel, FocusTrap, WebKeyValueStorage,
};
use crate::sdk::{PaypalJsSdk, StripeJsSdk};
use crate::status::SignalStatusSink;

/// Auxiliary surface for team attribution.
pub const TEAM_DRAWER_ID: &str = "team-drawer";

/// Landmark regions marked inert while a modal surface is open. The
/// overlays themselves live outside these regions.
const BACKGROUND_SELECTOR: &str = "[data-app-region]";

/// Everything the components need. Provided through Leptos context as a
/// `StoredValue` with local storage, since the engine handles are `Rc`s.
#[derive(Clone)]
pub struct CheckoutContext {
    pub config: Rc<CheckoutConfig>,
    pub draft: Rc<DraftStore>,
    pub overlays: Rc<OverlayManager>,
    pub orchestrator: Rc<CheckoutOrchestrator>,
    pub status: SignalStatusSink,
    pub summary: RwSignal<DraftSummary>,
    pub team: RwSignal<Option<String>>,
}

/// Fetch the checkout context inside a component.
pub fn use_checkout() -> CheckoutContext {
    expect_context::<StoredValue<CheckoutContext, LocalStorage>>().get_value()
}

pub fn initialize(config: CheckoutConfig) -> CheckoutContext {
    let config = Rc::new(config);

    let durable: Rc<dyn KeyValueStorage> = Rc::new(WebKeyValueStorage::durable());
    let volatile: Rc<dyn KeyValueStorage> = Rc::new(WebKeyValueStorage::volatile());
    let seed = load_or_create_seed(volatile.as_ref());

    let draft = Rc::new(DraftStore::new(config.clone(), durable, volatile));
    let overlays = Rc::new(OverlayManager::new(Rc::new(DomPageChrome::new(
        BACKGROUND_SELECTOR,
    ))));

    let status = SignalStatusSink::new();
    let sleeper: Rc<dyn Sleeper> = Rc::new(DomSleeper);
    let backend: Rc<dyn CheckoutBackend> = Rc::new(CheckoutApi::new(&config, sleeper.clone()));
    let scripts = Rc::new(ScriptLoader::new(Rc::new(DomScriptHost)));

    let paypal_sdk = PaypalJsSdk::new();
    let stripe: Rc<dyn ProviderAdapter> = Rc::new(StripeAdapter::new(
        config.clone(),
        backend.clone(),
        scripts.clone(),
        StripeJsSdk::new(),
        seed.clone(),
    ));
    let paypal: Rc<dyn ProviderAdapter> = Rc::new(PaypalAdapter::new(
        config.clone(),
        backend,
        scripts,
        paypal_sdk.clone(),
        seed,
    ));

    let orchestrator = Rc::new(CheckoutOrchestrator::new(
        config.clone(),
        draft.clone(),
        overlays.clone(),
        vec![stripe, paypal],
        Rc::new(status.clone()),
        sleeper,
    ));

    // wallet approval feeds the same submit flow as the card button
    paypal_sdk.set_approval_hook(Rc::new({
        let orchestrator = orchestrator.clone();
        move || {
            let orchestrator = orchestrator.clone();
            leptos::task::spawn_local(async move {
                orchestrator.submit(ProviderKind::Paypal).await;
            });
        }
    }));

    // draft mutations drive both the reactive summary and the debounced
    // re-evaluation
    let summary = RwSignal::new(draft.summary());
    let team = RwSignal::new(draft.snapshot().team_id);
    draft.subscribe(Box::new({
        let draft = draft.clone();
        let orchestrator = orchestrator.clone();
        move |changed: &DraftSummary| {
            summary.set(changed.clone());
            team.set(draft.snapshot().team_id);
            let orchestrator = orchestrator.clone();
            leptos::task::spawn_local(async move {
                orchestrator.draft_changed().await;
            });
        }
    }));

    CheckoutContext {
        config,
        draft,
        overlays,
        orchestrator,
        status,
        summary,
        team,
    }
}

/// DOM-dependent wiring; runs once, after the first render has put the
/// surfaces into the document.
pub fn wire_dom(ctx: &CheckoutContext) {
    ctx.overlays.register(
        CHECKOUT_SURFACE_ID,
        DomSurfacePanel::new(CHECKOUT_SURFACE_ID),
        SurfaceKind::Checkout,
        true,
    );
    ctx.overlays.register(
        TEAM_DRAWER_ID,
        DomSurfacePanel::new(TEAM_DRAWER_ID),
        SurfaceKind::Auxiliary,
        false,
    );
    // close-by-contract normalizes whatever state the markup shipped with
    ctx.overlays.close(CHECKOUT_SURFACE_ID);
    ctx.overlays.close(TEAM_DRAWER_ID);

    let trap = FocusTrap::new();
    ctx.overlays.subscribe(Box::new({
        let orchestrator = ctx.orchestrator.clone();
        let overlays = Rc::downgrade(&ctx.overlays);
        let trap = trap.clone();
        move |event| match event {
            OverlayEvent::Opened(id) => {
                if let Some(overlays) = overlays.upgrade() {
                    trap.install(id, overlays);
                }
                if id == CHECKOUT_SURFACE_ID {
                    let orchestrator = orchestrator.clone();
                    leptos::task::spawn_local(async move {
                        orchestrator.checkout_opened().await;
                    });
                }
            }
            OverlayEvent::Closed(id) => {
                trap.release();
                if let Some(overlays) = overlays.upgrade() {
                    // checkout regains trap ownership when an auxiliary
                    // surface closes on top of it
                    if overlays.is_open(CHECKOUT_SURFACE_ID) {
                        trap.install(CHECKOUT_SURFACE_ID, overlays);
                    }
                }
                if id == CHECKOUT_SURFACE_ID {
                    orchestrator.checkout_closed();
                }
            }
        }
    }));

    // the hash is the source of truth on reload and back/forward
    let on_hashchange = Closure::<dyn FnMut(web_sys::Event)>::new({
        let overlays = Rc::downgrade(&ctx.overlays);
        move |_event: web_sys::Event| {
            if let Some(overlays) = overlays.upgrade() {
                overlays.sync_from_hash(crate::dom::current_hash().as_deref());
            }
        }
    });
    if let Some(window) = web_sys::window() {
        let _ = window.add_event_listener_with_callback(
            "hashchange",
            on_hashchange.as_ref().unchecked_ref(),
        );
    }
    // page-lifetime listener
    on_hashchange.forget();

    ctx.overlays
        .sync_from_hash(crate::dom::current_hash().as_deref());
}
