//! Durable client storage.
//!
//! Only the token-registration concern crosses reloads: the session
//! credential, the last registered token and the "registered once" flag.
//! Notification display state is never persisted.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::StorageKeys;
use crate::error::PushError;

/// String key/value storage (`localStorage` in the browser).
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<(), PushError>;
    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), PushError>;
}

/// In-memory store.
///
/// Uses Rc<RefCell<...>> since WASM is single-threaded; clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PushError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PushError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Token registered with the backend for this device.
///
/// Replaced wholesale when the provider rotates the token; the old record is
/// never deleted explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    /// Provider token value.
    pub token: String,
    /// Whether the backend acknowledged it.
    pub registered: bool,
}

/// Typed access to the durable entries.
#[derive(Debug, Clone)]
pub struct DurableState<S> {
    store: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> DurableState<S> {
    /// Wrap a store using the given key names.
    pub fn new(store: S, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Session credential, if a non-empty one is stored.
    pub fn session(&self) -> Option<String> {
        self.store
            .get(&self.keys.session)
            .filter(|s| !s.trim().is_empty())
    }

    /// Drop the session credential, forcing re-authentication upstream.
    pub fn clear_session(&self) -> Result<(), PushError> {
        self.store.remove(&self.keys.session)
    }

    /// The stored registration, if any token was ever recorded.
    pub fn device_registration(&self) -> Option<DeviceRegistration> {
        let token = self
            .store
            .get(&self.keys.last_token)
            .filter(|t| !t.is_empty())?;
        let registered = self
            .store
            .get(&self.keys.registered_once)
            .is_some_and(|v| v == "1" || v == "true");
        Some(DeviceRegistration { token, registered })
    }

    /// Persist a registration, replacing whatever was there.
    pub fn save_device_registration(&self, registration: &DeviceRegistration) -> Result<(), PushError> {
        self.store.set(&self.keys.last_token, &registration.token)?;
        self.store.set(
            &self.keys.registered_once,
            if registration.registered { "1" } else { "0" },
        )
    }

    /// Whether `token` must be POSTed: it differs from the stored token or the
    /// backend never acknowledged one.
    pub fn needs_registration(&self, token: &str) -> bool {
        match self.device_registration() {
            Some(existing) => existing.token != token || !existing.registered,
            None => true,
        }
    }
}
