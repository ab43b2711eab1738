//! UI Components
//!
//! Dynamic render closures only ever capture `Copy` signal handles or
//! plain data; everything holding an `Rc` (the checkout context) stays
//! inside event handlers, which only run in the browser.

use leptos::prelude::*;
use wasm_bindgen::JsCast;

use donor_core::money::format_cents;
use donor_core::ToastLevel;
use donor_payments::{ProviderKind, CHECKOUT_SURFACE_ID};

use crate::boot::{use_checkout, TEAM_DRAWER_ID};
use crate::sdk::paypal::WALLET_CONTAINER_ID;
use crate::sdk::stripe::CARD_CONTAINER_ID;

/// True when the click landed on the backdrop or surface root, not the
/// inner panel.
fn clicked_outside_panel(ev: &web_sys::MouseEvent) -> bool {
    ev.target()
        .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
        .is_some_and(|element| element.closest(".overlay-panel").ok().flatten().is_none())
}

/// Opens the checkout sheet; pointer/focus intent prewarms the SDK
/// script caches without creating any session.
#[component]
pub fn DonateLauncher() -> impl IntoView {
    let ctx = use_checkout();
    let has_teams = !ctx.config.teams.is_empty();

    let open = {
        let ctx = ctx.clone();
        move |_| ctx.overlays.open(CHECKOUT_SURFACE_ID)
    };
    let prewarm_pointer = {
        let ctx = ctx.clone();
        move |_| {
            let orchestrator = ctx.orchestrator.clone();
            leptos::task::spawn_local(async move {
                orchestrator.prewarm().await;
            });
        }
    };
    let prewarm_focus = {
        let ctx = ctx.clone();
        move |_| {
            let orchestrator = ctx.orchestrator.clone();
            leptos::task::spawn_local(async move {
                orchestrator.prewarm().await;
            });
        }
    };
    let open_drawer = {
        let ctx = ctx.clone();
        move |_| ctx.overlays.open(TEAM_DRAWER_ID)
    };

    view! {
        <div class="donate-actions">
            <button
                class="btn btn-primary donate-launcher"
                on:click=open
                on:pointerenter=prewarm_pointer
                on:focus=prewarm_focus
            >
                "Donate"
            </button>
            {has_teams.then(|| {
                view! {
                    <button class="btn btn-ghost" on:click=open_drawer>
                        "Give with a team"
                    </button>
                }
            })}
        </div>
    }
}

/// The checkout sheet. Ships closed; the overlay manager owns every
/// open/close signal from here on.
#[component]
pub fn CheckoutOverlay() -> impl IntoView {
    let ctx = use_checkout();
    let inline_error = ctx.status.inline_error;

    let close = {
        let ctx = ctx.clone();
        move |_| ctx.overlays.close(CHECKOUT_SURFACE_ID)
    };
    let outside = {
        let ctx = ctx.clone();
        move |ev: web_sys::MouseEvent| {
            if clicked_outside_panel(&ev) {
                ctx.overlays.outside_click(CHECKOUT_SURFACE_ID);
            }
        }
    };

    view! {
        <div
            id="checkout"
            class="overlay overlay-checkout"
            hidden=""
            aria-hidden="true"
            on:click=outside
        >
            <div class="overlay-backdrop"></div>
            <div
                class="overlay-panel"
                role="dialog"
                aria-modal="true"
                aria-label="Make a donation"
                tabindex="-1"
            >
                <button class="overlay-close" data-overlay-close="" on:click=close>
                    "\u{2715}"
                </button>
                <h2>"Make a donation"</h2>

                <AmountField />
                <DonorInputs />
                <GiftOptions />
                <SummaryList />

                <div id=CARD_CONTAINER_ID class="payment-element"></div>
                <div id=WALLET_CONTAINER_ID class="payment-buttons"></div>

                <p class="inline-error" role="alert">
                    {move || inline_error.get()}
                </p>

                <SubmitButton />
            </div>
        </div>
    }
}

#[component]
fn AmountField() -> impl IntoView {
    let ctx = use_checkout();
    let (hint, set_hint) = signal(Option::<String>::None);

    let input = {
        let ctx = ctx.clone();
        move |ev| match ctx.draft.set_amount_input(&event_target_value(&ev)) {
            Ok(_) => set_hint.set(None),
            Err(err) => set_hint.set(Some(err.to_string())),
        }
    };
    // commit-time floor on blur, not per keystroke
    let blur = {
        let ctx = ctx.clone();
        move |_| ctx.draft.commit_amount()
    };

    view! {
        <div class="field field-amount">
            <label for="donation-amount">"Amount"</label>
            <input
                id="donation-amount"
                type="text"
                inputmode="decimal"
                placeholder="25.00"
                autocomplete="off"
                on:input=input
                on:blur=blur
            />
            <p class="field-hint">{move || hint.get()}</p>
        </div>
    }
}

#[component]
fn DonorInputs() -> impl IntoView {
    let ctx = use_checkout();
    let team = ctx.team;

    let email = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_donor_email(&event_target_value(&ev))
    };
    let name = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_donor_name(&event_target_value(&ev))
    };
    let message = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_donor_message(&event_target_value(&ev))
    };

    view! {
        <div class="field">
            <label for="donor-email">"Email"</label>
            <input id="donor-email" type="email" autocomplete="email" on:input=email />
        </div>
        <div class="field">
            <label for="donor-name">"Name"</label>
            <input id="donor-name" type="text" autocomplete="name" on:input=name />
        </div>
        <div class="field">
            <label for="donor-message">"Message (optional)"</label>
            <textarea id="donor-message" rows="2" on:input=message></textarea>
        </div>
        // billing identity follows team attribution
        <input
            type="hidden"
            name="attribution_team"
            prop:value=move || team.get().unwrap_or_default()
        />
    }
}

#[component]
fn GiftOptions() -> impl IntoView {
    let ctx = use_checkout();

    let cover = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_cover_fees(event_target_checked(&ev))
    };
    let round_up = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_round_up(event_target_checked(&ev))
    };
    let anonymous = {
        let ctx = ctx.clone();
        move |ev| ctx.draft.set_anonymous(event_target_checked(&ev))
    };

    view! {
        <div class="gift-options">
            <label class="checkbox">
                <input type="checkbox" on:change=cover />
                "Cover the processing fees"
            </label>
            <label class="checkbox">
                <input type="checkbox" on:change=round_up />
                "Round up my donation"
            </label>
            <label class="checkbox">
                <input type="checkbox" on:change=anonymous />
                "Give anonymously"
            </label>
        </div>
    }
}

#[component]
fn SummaryList() -> impl IntoView {
    let ctx = use_checkout();
    let summary = ctx.summary;

    view! {
        <dl class="summary">
            <div class="summary-row">
                <dt>"Donation"</dt>
                <dd>{move || summary.get().display_base}</dd>
            </div>
            <Show when=move || { summary.get().round_up_cents > 0 }>
                <div class="summary-row">
                    <dt>"Round-up"</dt>
                    <dd>{move || format_cents(summary.get().round_up_cents)}</dd>
                </div>
            </Show>
            <Show when=move || { summary.get().fee_cover_cents > 0 }>
                <div class="summary-row">
                    <dt>"Fee cover"</dt>
                    <dd>{move || format_cents(summary.get().fee_cover_cents)}</dd>
                </div>
            </Show>
            <div class="summary-row summary-total">
                <dt>"Total"</dt>
                <dd>{move || summary.get().display_total}</dd>
            </div>
        </dl>
    }
}

#[component]
fn SubmitButton() -> impl IntoView {
    let ctx = use_checkout();
    let busy = ctx.status.busy;
    let enabled = ctx.status.submit_enabled;

    let submit = {
        let ctx = ctx.clone();
        move |_| {
            let orchestrator = ctx.orchestrator.clone();
            leptos::task::spawn_local(async move {
                orchestrator.submit(ProviderKind::Stripe).await;
            });
        }
    };

    view! {
        <button
            class="btn btn-primary submit-donation"
            on:click=submit
            disabled=move || busy.get() || !enabled.get()
        >
            {move || if busy.get() { "Processing…" } else { "Donate now" }}
        </button>
    }
}

/// Team attribution drawer (auxiliary surface). The team list is static
/// page config, so it renders once.
#[component]
pub fn TeamDrawer() -> impl IntoView {
    let ctx = use_checkout();

    let close = {
        let ctx = ctx.clone();
        move |_| ctx.overlays.close(TEAM_DRAWER_ID)
    };
    let outside = {
        let ctx = ctx.clone();
        move |ev: web_sys::MouseEvent| {
            if clicked_outside_panel(&ev) {
                ctx.overlays.outside_click(TEAM_DRAWER_ID);
            }
        }
    };

    let options = ctx
        .config
        .teams
        .iter()
        .map(|team| {
            let pick = {
                let ctx = ctx.clone();
                let id = team.id.clone();
                move |_| {
                    ctx.draft.set_team(&id);
                    // team re-selection re-prepares immediately
                    let orchestrator = ctx.orchestrator.clone();
                    leptos::task::spawn_local(async move {
                        orchestrator.force_refresh().await;
                    });
                    ctx.overlays.close(TEAM_DRAWER_ID);
                }
            };
            view! {
                <li>
                    <button class="team-option" on:click=pick>
                        {team.label.clone()}
                    </button>
                </li>
            }
        })
        .collect_view();

    view! {
        <div
            id="team-drawer"
            class="overlay overlay-drawer"
            hidden=""
            aria-hidden="true"
            on:click=outside
        >
            <div class="overlay-backdrop"></div>
            <div class="overlay-panel" role="dialog" aria-label="Choose a team" tabindex="-1">
                <button class="overlay-close" data-overlay-close="" on:click=close>
                    "\u{2715}"
                </button>
                <h2>"Give with a team"</h2>
                <ul class="team-list">{options}</ul>
            </div>
        </div>
    }
}

/// Toast stack fed by the status sink; entries dismiss themselves.
#[component]
pub fn ToastStack() -> impl IntoView {
    let ctx = use_checkout();
    let toasts = ctx.status.toasts;

    view! {
        <div class="toast-stack" aria-live="polite">
            <For
                each=move || toasts.get()
                key=|toast| toast.id
                children=|toast| {
                    let class = format!(
                        "toast toast-{}",
                        match toast.level {
                            ToastLevel::Success => "success",
                            ToastLevel::Info => "info",
                            ToastLevel::Error => "error",
                        }
                    );
                    view! { <div class=class>{toast.message.clone()}</div> }
                }
            />
        </div>
    }
}
