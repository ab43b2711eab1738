//! Main App Component

use leptos::prelude::*;

use donor_core::CheckoutConfig;

use crate::boot;
use crate::components::{CheckoutOverlay, DonateLauncher, TeamDrawer, ToastStack};

/// Root application component. Engine construction happens before the
/// view renders; DOM-dependent wiring runs right after this render tick,
/// once the surfaces are in the document.
#[component]
pub fn App(config: CheckoutConfig) -> impl IntoView {
    let ctx = boot::initialize(config);
    provide_context(StoredValue::new_local(ctx.clone()));

    let wire_ctx = ctx.clone();
    leptos::task::spawn_local(async move {
        boot::wire_dom(&wire_ctx);
    });

    view! {
        <main class="donate-page" data-app-region="">
            <section class="donate-hero">
                <h1>"Support the campaign"</h1>
                <p class="subtitle">"Every donation counts."</p>
                <DonateLauncher />
            </section>
        </main>
        <CheckoutOverlay />
        <TeamDrawer />
        <ToastStack />
    }
}
