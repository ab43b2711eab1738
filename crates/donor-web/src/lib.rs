//! donor-kit Web Frontend
//!
//! Leptos-based WASM frontend for the donation checkout. All DOM and
//! SDK access lives here, behind the seams the engine crates define.

mod app;
mod boot;
mod components;
mod dom;
mod page;
mod sdk;
mod status;

pub use app::App;

use std::rc::Rc;

use wasm_bindgen::prelude::*;

use donor_payments::Sleeper;

/// WASM entry point. Configuration resolves first (embedded blob, then
/// the server config endpoint) so the engine boots with its final keys.
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::task::spawn_local(async {
        let sleeper: Rc<dyn Sleeper> = Rc::new(dom::DomSleeper);
        let config = page::resolve_config(sleeper).await;
        leptos::mount::mount_to_body(move || leptos::view! { <App config=config /> });
    });
}
