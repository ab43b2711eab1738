//! Timer Seam
//!
//! Debounce and request timeouts need a clock the engine does not own:
//! the browser supplies `setTimeout`, native tests supply `tokio::time`.

use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Injectable sleep. Futures are local because browser timers are not
/// `Send`.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}
