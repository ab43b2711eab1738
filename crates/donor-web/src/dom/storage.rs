//! Web Storage
//!
//! `localStorage` (durable, survives reloads) and `sessionStorage`
//! (volatile, survives same-tab navigation) behind the core trait.
//! Quota or privacy-mode failures are swallowed; persistence is an
//! optimization, never a requirement.

use donor_core::KeyValueStorage;

enum Area {
    Durable,
    Volatile,
}

pub struct WebKeyValueStorage {
    area: Area,
}

impl WebKeyValueStorage {
    /// Backed by `localStorage`.
    pub fn durable() -> Self {
        Self { area: Area::Durable }
    }

    /// Backed by `sessionStorage`.
    pub fn volatile() -> Self {
        Self { area: Area::Volatile }
    }

    fn storage(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        match self.area {
            Area::Durable => window.local_storage().ok().flatten(),
            Area::Volatile => window.session_storage().ok().flatten(),
        }
    }
}

impl KeyValueStorage for WebKeyValueStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.set_item(key, value);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }
}
