//! Single-Flight SDK Script Loading
//!
//! A process-wide registry mapping script URL to an in-flight-or-resolved
//! load. Concurrent callers share one pending future; a script already
//! loaded resolves immediately; a failed load evicts the slot so a retry
//! can re-inject. This module owns the registry — nothing else caches
//! script state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;

use crate::error::PaymentError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script failed to load: {0}")]
    Load(String),
}

/// Attributes propagated onto injected `<script>` tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptAttrs {
    /// CSP nonce
    pub nonce: Option<String>,
    pub crossorigin: Option<String>,
}

/// Injection seam: the browser appends a tag and resolves on its
/// load/error event; tests count invocations.
pub trait ScriptHost {
    fn inject(&self, url: &str, attrs: &ScriptAttrs)
        -> LocalBoxFuture<'static, std::result::Result<(), ScriptError>>;
}

type SharedLoad = Shared<LocalBoxFuture<'static, std::result::Result<(), ScriptError>>>;

enum Slot {
    Loading(SharedLoad),
    Loaded,
}

/// Deduplicating loader over a [`ScriptHost`].
pub struct ScriptLoader {
    host: Rc<dyn ScriptHost>,
    slots: RefCell<HashMap<String, Slot>>,
}

impl ScriptLoader {
    pub fn new(host: Rc<dyn ScriptHost>) -> Self {
        Self {
            host,
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Load `url` exactly once. Concurrent callers await the same
    /// in-flight future; later callers return immediately.
    pub async fn ensure(&self, url: &str, attrs: &ScriptAttrs) -> Result<(), PaymentError> {
        let pending = {
            let mut slots = self.slots.borrow_mut();
            match slots.get(url) {
                Some(Slot::Loaded) => return Ok(()),
                Some(Slot::Loading(shared)) => shared.clone(),
                None => {
                    tracing::debug!(url, "injecting provider script");
                    let shared = self.host.inject(url, attrs).shared();
                    slots.insert(url.into(), Slot::Loading(shared.clone()));
                    shared
                }
            }
        };

        match pending.await {
            Ok(()) => {
                self.slots.borrow_mut().insert(url.into(), Slot::Loaded);
                Ok(())
            }
            Err(err) => {
                // evict so the next prepare can retry the injection
                let mut slots = self.slots.borrow_mut();
                if matches!(slots.get(url), Some(Slot::Loading(_))) {
                    slots.remove(url);
                }
                tracing::warn!(url, %err, "provider script failed to load");
                Err(PaymentError::Network {
                    message: err.to_string(),
                    timed_out: false,
                })
            }
        }
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        matches!(self.slots.borrow().get(url), Some(Slot::Loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Host whose injections stay pending until the test releases them.
    struct FakeHost {
        injections: Cell<u32>,
        result: RefCell<std::result::Result<(), ScriptError>>,
        gate: RefCell<Vec<futures::channel::oneshot::Sender<()>>>,
    }

    impl FakeHost {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                injections: Cell::new(0),
                result: RefCell::new(Ok(())),
                gate: RefCell::new(Vec::new()),
            })
        }

        fn release_all(&self) {
            for sender in self.gate.borrow_mut().drain(..) {
                let _ = sender.send(());
            }
        }
    }

    impl ScriptHost for FakeHost {
        fn inject(
            &self,
            _url: &str,
            _attrs: &ScriptAttrs,
        ) -> LocalBoxFuture<'static, std::result::Result<(), ScriptError>> {
            self.injections.set(self.injections.get() + 1);
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.gate.borrow_mut().push(sender);
            let result = self.result.borrow().clone();
            async move {
                let _ = receiver.await;
                result
            }
            .boxed_local()
        }
    }

    const URL: &str = "https://js.stripe.com/v3/";

    #[tokio::test]
    async fn test_concurrent_callers_share_one_injection() {
        let host = FakeHost::new();
        let loader = ScriptLoader::new(host.clone());

        let attrs = ScriptAttrs::default();
        let first = loader.ensure(URL, &attrs);
        let second = loader.ensure(URL, &attrs);
        let release = async {
            host.release_all();
        };
        let (a, b, ()) = futures::join!(first, second, release);

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(host.injections.get(), 1);
    }

    #[tokio::test]
    async fn test_loaded_script_resolves_without_reinjection() {
        let host = FakeHost::new();
        let loader = ScriptLoader::new(host.clone());

        let attrs = ScriptAttrs::default();
        let load = loader.ensure(URL, &attrs);
        let release = async {
            host.release_all();
        };
        let _ = futures::join!(load, release);

        loader.ensure(URL, &ScriptAttrs::default()).await.unwrap();
        assert_eq!(host.injections.get(), 1);
        assert!(loader.is_loaded(URL));
    }

    #[tokio::test]
    async fn test_failed_load_is_retryable() {
        let host = FakeHost::new();
        let loader = ScriptLoader::new(host.clone());
        *host.result.borrow_mut() = Err(ScriptError::Load("blocked".into()));

        let attrs = ScriptAttrs::default();
        let load = loader.ensure(URL, &attrs);
        let release = async {
            host.release_all();
        };
        let (result, ()) = futures::join!(load, release);
        assert!(matches!(result, Err(PaymentError::Network { .. })));
        assert!(!loader.is_loaded(URL));

        // the slot was evicted; a retry injects again and can succeed
        *host.result.borrow_mut() = Ok(());
        let attrs = ScriptAttrs::default();
        let load = loader.ensure(URL, &attrs);
        let release = async {
            host.release_all();
        };
        let (result, ()) = futures::join!(load, release);
        assert!(result.is_ok());
        assert_eq!(host.injections.get(), 2);
    }
}
