//! # donor-core
//!
//! Platform-neutral state for the donation checkout engine: the overlay
//! lifecycle state machine, the donation draft store, money parsing and
//! fee math, and the page-supplied configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      donor-core                              │
//! │  ┌──────────────┐  ┌─────────────┐  ┌────────────────────┐  │
//! │  │   Overlay    │  │    Draft    │  │   Money / Config   │  │
//! │  │   Manager    │  │    Store    │  │   (cents, fees)    │  │
//! │  └──────┬───────┘  └──────┬──────┘  └────────────────────┘  │
//! │         │ SurfacePanel    │ KeyValueStorage                 │
//! │         │ PageChrome      │                                 │
//! └─────────┼─────────────────┼─────────────────────────────────┘
//!           ▼                 ▼
//!     DOM render seam    web storage seam   (implemented in donor-web)
//! ```
//!
//! Everything behind the seams is deterministic and unit-tested
//! natively; the DOM is strictly an output of the render traits, never
//! an input to the next state transition.

pub mod config;
pub mod draft;
pub mod error;
pub mod money;
pub mod notify;
pub mod overlay;

pub use config::{CheckoutConfig, FeeSchedule, TeamEntry};
pub use draft::{DonationDraft, DraftStore, DraftSummary, KeyValueStorage, MemoryStorage};
pub use error::DraftError;
pub use notify::{NullStatusSink, StatusSink, ToastLevel};
pub use overlay::{
    FocusTarget, OverlayEvent, OverlayManager, PageChrome, SurfaceKind, SurfacePanel,
};
