//! Provider SDK Bridges
//!
//! Thin `js-sys` surfaces over the SDK globals. The contract with the
//! script loader is "the global exists and exposes its documented
//! constructor/Buttons factory after the load event fires" — these
//! bridges assume exactly that and nothing more.

pub mod js;
pub mod paypal;
pub mod stripe;

pub use paypal::PaypalJsSdk;
pub use stripe::StripeJsSdk;
