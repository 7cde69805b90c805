//! Provider bindings over the Firebase compat SDK (`firebase.messaging()`).
//!
//! The host page (or the worker via `importScripts`) loads the compat
//! scripts; this module only calls into the global `firebase` namespace.

use async_trait::async_trait;
use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::capability::{PermissionValue, PlatformSnapshot};
use crate::config::PushConfig;
use crate::error::PushError;
use crate::provider::PushProvider;

use super::{js_error_message, to_js};

#[wasm_bindgen]
extern "C" {
    /// `firebase.messaging.Messaging`.
    pub type Messaging;

    #[wasm_bindgen(catch, js_namespace = firebase, js_name = messaging)]
    fn messaging_instance() -> Result<Messaging, JsValue>;

    #[wasm_bindgen(catch, js_namespace = firebase, js_name = initializeApp)]
    fn initialize_app(options: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getToken)]
    fn get_token(this: &Messaging, options: &JsValue) -> Result<js_sys::Promise, JsValue>;

    /// Subscribe to page-context messages. Returns the unsubscribe function.
    #[wasm_bindgen(method, js_name = onMessage)]
    pub fn on_message(this: &Messaging, handler: &Closure<dyn FnMut(JsValue)>) -> JsValue;

    /// Subscribe to worker-context messages.
    #[wasm_bindgen(method, js_name = onBackgroundMessage)]
    pub fn on_background_message(this: &Messaging, handler: &Closure<dyn FnMut(JsValue)>) -> JsValue;
}

fn firebase_global() -> Option<JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str("firebase"))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Initialize the default app from `config.firebase` unless the host already did.
pub fn ensure_app(config: &PushConfig) -> Result<(), PushError> {
    let firebase = firebase_global()
        .ok_or_else(|| PushError::Config("Firebase SDK not loaded (window.firebase missing)".into()))?;

    let existing = Reflect::get(&firebase, &JsValue::from_str("apps"))
        .ok()
        .and_then(|apps| apps.dyn_into::<js_sys::Array>().ok())
        .map_or(0, |apps| apps.length());
    if existing > 0 {
        return Ok(());
    }

    let options = config
        .firebase
        .as_ref()
        .ok_or_else(|| PushError::Config("Firebase app not initialized and no firebase options given".into()))?;
    let options = to_js(options).map_err(|e| PushError::Config(js_error_message(&e)))?;
    initialize_app(&options).map_err(|e| PushError::Config(format!("initializeApp: {}", js_error_message(&e))))?;
    log::debug!("[Push] Firebase app initialized");
    Ok(())
}

/// The messaging instance for the default app.
pub fn messaging(config: &PushConfig) -> Result<Messaging, PushError> {
    ensure_app(config)?;
    messaging_instance().map_err(|e| PushError::ProviderToken(format!("firebase.messaging(): {}", js_error_message(&e))))
}

/// Current `Notification.permission`, `Default` when the API is missing.
pub fn notification_permission() -> PermissionValue {
    if !has_global("Notification") {
        return PermissionValue::Default;
    }
    match web_sys::Notification::permission() {
        web_sys::NotificationPermission::Granted => PermissionValue::Granted,
        web_sys::NotificationPermission::Denied => PermissionValue::Denied,
        _ => PermissionValue::Default,
    }
}

fn has_global(name: &str) -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str(name)).unwrap_or(false)
}

fn is_standalone(window: &web_sys::Window) -> bool {
    let display_mode = window
        .match_media("(display-mode: standalone)")
        .ok()
        .flatten()
        .is_some_and(|query| query.matches());
    // iOS home-screen apps expose navigator.standalone instead
    let ios_standalone = Reflect::get(&window.navigator(), &JsValue::from_str("standalone"))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    display_mode || ios_standalone
}

/// Page-context provider backed by Firebase Cloud Messaging.
pub struct FirebaseProvider {
    config: PushConfig,
}

impl FirebaseProvider {
    /// Provider for `config`. The SDK is touched lazily.
    pub fn new(config: &PushConfig) -> Self {
        Self { config: config.clone() }
    }
}

#[async_trait(?Send)]
impl PushProvider for FirebaseProvider {
    type Registration = web_sys::ServiceWorkerRegistration;

    fn platform(&self) -> PlatformSnapshot {
        let Some(window) = web_sys::window() else {
            return PlatformSnapshot::default();
        };
        let navigator = window.navigator();
        PlatformSnapshot {
            notification_api: has_global("Notification"),
            service_worker: Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false),
            push_manager: has_global("PushManager"),
            permission: notification_permission(),
            user_agent: navigator.user_agent().unwrap_or_default(),
            standalone: is_standalone(&window),
        }
    }

    async fn request_permission(&self) -> PermissionValue {
        let promise = match web_sys::Notification::request_permission() {
            Ok(promise) => promise,
            Err(e) => {
                log::warn!("[Push] requestPermission threw: {}", js_error_message(&e));
                return notification_permission();
            }
        };
        match JsFuture::from(promise).await {
            Ok(answer) => answer
                .as_string()
                .map_or_else(notification_permission, |s| PermissionValue::parse(&s)),
            Err(e) => {
                log::warn!("[Push] requestPermission rejected: {}", js_error_message(&e));
                notification_permission()
            }
        }
    }

    async fn mint_token(
        &self,
        vapid_key: &str,
        registration: &Self::Registration,
    ) -> Result<String, PushError> {
        let messaging = messaging(&self.config)?;

        let options = Object::new();
        let set = |key: &str, value: &JsValue| {
            Reflect::set(&options, &JsValue::from_str(key), value)
                .map_err(|e| PushError::ProviderToken(js_error_message(&e)))
        };
        set("vapidKey", &JsValue::from_str(vapid_key))?;
        set("serviceWorkerRegistration", registration.as_ref())?;

        let promise = messaging
            .get_token(&options)
            .map_err(|e| PushError::ProviderToken(js_error_message(&e)))?;
        let token = JsFuture::from(promise)
            .await
            .map_err(|e| PushError::ProviderToken(js_error_message(&e)))?;

        token
            .as_string()
            .ok_or_else(|| PushError::ProviderToken("getToken resolved without a token".into()))
    }
}
