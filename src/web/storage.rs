//! `localStorage`-backed [`KeyValueStore`].

use crate::error::PushError;
use crate::storage::KeyValueStore;

use super::js_error_message;

/// The page's `localStorage`.
#[derive(Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open `window.localStorage`. Unavailable in workers and some private modes.
    pub fn open() -> Result<Self, PushError> {
        let window = web_sys::window().ok_or_else(|| PushError::Storage("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|e| PushError::Storage(js_error_message(&e)))?
            .ok_or_else(|| PushError::Storage("localStorage unavailable".into()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PushError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| PushError::Storage(format!("set {key}: {}", js_error_message(&e))))
    }

    fn remove(&self, key: &str) -> Result<(), PushError> {
        self.storage
            .remove_item(key)
            .map_err(|e| PushError::Storage(format!("remove {key}: {}", js_error_message(&e))))
    }
}
