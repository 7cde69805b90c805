//! Page-context entry point exported to JavaScript.
//!
//! ```js
//! import init, { PushClient } from "./pkg/ranking_push_wasm.js";
//! await init();
//! const push = new PushClient({ api_url, vapid_key });
//! push.listenForeground();
//! push.watchDeepLinks((id) => openDesafio(id));
//! const report = await push.autoRegister(); // { ok, token?, reason?, message? }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::backend::BackendClient;
use crate::capability::classify;
use crate::config::PushConfig;
use crate::deeplink::{resolve, PageLocation, PendingOpen};
use crate::error::PushError;
use crate::foreground::{present, Decision, DisplayRequest, ForegroundRouter};
use crate::payload::PushPayload;
use crate::provider::PushProvider;
use crate::token::{AutoRegisterReport, TokenLifecycle};

use super::firebase::{self, FirebaseProvider};
use super::service_worker::{BrowserServiceWorkers, PageNotifications};
use super::storage::LocalStorage;
use super::{js_error_message, now_ms, to_js};

type PageLifecycle = TokenLifecycle<FirebaseProvider, BrowserServiceWorkers, LocalStorage>;

struct PageState {
    config: PushConfig,
    lifecycle: PageLifecycle,
    router: RefCell<ForegroundRouter>,
    pending: RefCell<PendingOpen>,
    toast: RefCell<Option<js_sys::Function>>,
    deep_link_callback: RefCell<Option<js_sys::Function>>,
}

/// Push client for the page. Construct once per page load.
#[wasm_bindgen]
pub struct PushClient {
    state: Rc<PageState>,
}

#[wasm_bindgen]
impl PushClient {
    /// Create a client from a config object (missing fields use defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PushClient, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            PushConfig::default()
        } else {
            serde_wasm_bindgen::from_value::<PushConfig>(config)
                .map_err(|e| PushError::Config(e.to_string()))?
        }
        .normalized();

        let backend = BackendClient::new(reqwest::Client::new(), &config.api_url);
        let lifecycle = TokenLifecycle::new(
            &config,
            FirebaseProvider::new(&config),
            BrowserServiceWorkers::detect(),
            backend,
            LocalStorage::open()?,
        )?;

        Ok(PushClient {
            state: Rc::new(PageState {
                router: RefCell::new(ForegroundRouter::new(&config)),
                config,
                lifecycle,
                pending: RefCell::new(PendingOpen::new()),
                toast: RefCell::new(None),
                deep_link_callback: RefCell::new(None),
            }),
        })
    }

    /// Capability report: `{ state, remediation }`.
    pub fn capability(&self) -> Result<JsValue, JsValue> {
        let classification = classify(&self.state.lifecycle.provider().platform());
        to_js(&classification)
    }

    /// Non-prompting registration pass. Resolves to `{ ok, token?, reason?, message? }`.
    #[wasm_bindgen(js_name = autoRegister)]
    pub async fn auto_register(&self) -> Result<JsValue, JsValue> {
        let outcome = self.state.lifecycle.auto_register_if_granted().await;
        to_js(&AutoRegisterReport::from(&outcome))
    }

    /// Prompt if needed and register. Resolves to the token; rejects with a message.
    #[wasm_bindgen(js_name = enableNotifications)]
    pub async fn enable_notifications(&self) -> Result<String, JsValue> {
        Ok(self.state.lifecycle.enable_and_register().await?)
    }

    /// Called with `{ title, body, url }` for every displayed foreground message.
    #[wasm_bindgen(js_name = onForegroundToast)]
    pub fn on_foreground_toast(&self, callback: Option<js_sys::Function>) {
        *self.state.toast.borrow_mut() = callback;
    }

    /// Subscribe to foreground messages. Returns `false` if already subscribed.
    #[wasm_bindgen(js_name = listenForeground)]
    pub fn listen_foreground(&self) -> Result<bool, JsValue> {
        if !self.state.router.borrow_mut().attach() {
            log::debug!("[Foreground] Listener already attached");
            return Ok(false);
        }

        let messaging = firebase::messaging(&self.state.config)?;
        let state = Rc::clone(&self.state);
        let handler = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            on_foreground_message(&state, value);
        });
        messaging.on_message(&handler);
        handler.forget();
        log::info!("[Foreground] Listening for messages");
        Ok(true)
    }

    /// Resolve `open_desafio` now and on every `focus` and `popstate`.
    ///
    /// `callback(id)` fires once per newly pending target.
    #[wasm_bindgen(js_name = watchDeepLinks)]
    pub fn watch_deep_links(&self, callback: js_sys::Function) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| PushError::Navigation("no window".into()))?;
        let already_watching = self.state.deep_link_callback.borrow_mut().replace(callback).is_some();

        check_location(&self.state);
        if already_watching {
            return Ok(());
        }

        for event in ["load", "focus", "popstate"] {
            let state = Rc::clone(&self.state);
            let listener = Closure::<dyn FnMut()>::new(move || check_location(&state));
            window.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())?;
            listener.forget();
        }
        Ok(())
    }

    /// Subject id waiting to be opened, if any.
    #[wasm_bindgen(js_name = pendingOpen)]
    pub fn pending_open(&self) -> Option<f64> {
        self.state
            .pending
            .borrow()
            .peek()
            .map(|target| target.subject_id as f64)
    }

    /// Mark the pending subject as displayed.
    #[wasm_bindgen(js_name = clearPendingOpen)]
    pub fn clear_pending_open(&self) {
        self.state.pending.borrow_mut().clear();
    }
}

fn on_foreground_message(state: &Rc<PageState>, value: JsValue) {
    let payload: PushPayload = match serde_wasm_bindgen::from_value(value) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("[Foreground] Ignoring malformed message: {e}");
            return;
        }
    };

    let decision = state
        .router
        .borrow_mut()
        .handle(&payload, firebase::notification_permission(), now_ms());
    let Decision::Display(request) = decision else {
        return;
    };

    notify_toast(state, &request);

    let state = Rc::clone(state);
    wasm_bindgen_futures::spawn_local(async move {
        let registration = state.lifecycle.registrations().active_registration().await;
        match present(&PageNotifications, registration.as_ref(), &request).await {
            Ok(channel) => log::debug!("[Foreground] Shown via {channel:?}: {}", request.signature),
            Err(e) => log::error!("[Foreground] Could not display notification: {e}"),
        }
    });
}

fn notify_toast(state: &PageState, request: &DisplayRequest) {
    let Some(callback) = state.toast.borrow().clone() else {
        return;
    };
    let toast = match to_js(request) {
        Ok(toast) => toast,
        Err(e) => {
            log::warn!("[Foreground] Toast payload: {}", js_error_message(&e));
            return;
        }
    };
    if let Err(e) = callback.call1(&JsValue::NULL, &toast) {
        log::warn!("[Foreground] Toast callback threw: {}", js_error_message(&e));
    }
}

fn check_location(state: &PageState) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let (Ok(pathname), Ok(search), Ok(hash)) = (location.pathname(), location.search(), location.hash())
    else {
        return;
    };

    let Some(resolution) = resolve(PageLocation {
        pathname: &pathname,
        search: &search,
        hash: &hash,
    }) else {
        return;
    };

    match window.history() {
        Ok(history) => {
            if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(&resolution.replacement_url)) {
                log::warn!("[DeepLink] replaceState failed: {}", js_error_message(&e));
            }
        }
        Err(e) => log::warn!("[DeepLink] No history: {}", js_error_message(&e)),
    }

    if !state.pending.borrow_mut().offer(resolution.target) {
        return;
    }
    log::info!("[DeepLink] Pending open {}", resolution.target.subject_id);

    let Some(callback) = state.deep_link_callback.borrow().clone() else {
        return;
    };
    let id = JsValue::from_f64(resolution.target.subject_id as f64);
    if let Err(e) = callback.call1(&JsValue::NULL, &id) {
        log::warn!("[DeepLink] Callback threw: {}", js_error_message(&e));
    }
}
