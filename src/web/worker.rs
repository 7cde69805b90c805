//! Service worker entry point.
//!
//! ```js
//! // firebase-messaging-sw.js
//! importScripts("firebase-app-compat.js", "firebase-messaging-compat.js");
//! importScripts("./pkg/ranking_push_wasm.js");
//! wasm_bindgen("./pkg/ranking_push_wasm_bg.wasm").then(() =>
//!   wasm_bindgen.startBackgroundDelivery({ firebase: { ... } }));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::background::{handle_notification_click, BackgroundHandler, ClickedNotification, WindowClients};
use crate::config::PushConfig;
use crate::error::PushError;
use crate::foreground::Decision;
use crate::payload::PushPayload;

use super::service_worker::show_on_registration;
use super::{firebase, js_error_message, now_ms};

thread_local! {
    static HANDLER: RefCell<Option<Rc<RefCell<BackgroundHandler>>>> = const { RefCell::new(None) };
}

fn scope() -> web_sys::ServiceWorkerGlobalScope {
    js_sys::global().unchecked_into()
}

/// Install the background message handler and the click router.
///
/// Call from the worker script after the module has loaded. Returns `false`
/// when the handlers were already installed in this worker.
#[wasm_bindgen(js_name = startBackgroundDelivery)]
pub fn start_background_delivery(config: JsValue) -> Result<bool, JsValue> {
    let installed = HANDLER.with(|slot| slot.borrow().as_ref().is_some_and(|h| h.borrow().is_attached()));
    if installed {
        log::debug!("[Background] Delivery handlers already installed");
        return Ok(false);
    }

    let config = if config.is_undefined() || config.is_null() {
        PushConfig::default()
    } else {
        serde_wasm_bindgen::from_value::<PushConfig>(config).map_err(|e| PushError::Config(e.to_string()))?
    }
    .normalized();

    let messaging = firebase::messaging(&config)?;
    let handler = Rc::new(RefCell::new(BackgroundHandler::new(&config)));
    handler.borrow_mut().attach();
    HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&handler)));

    let on_message = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        on_background_message(&handler, value);
    });
    messaging.on_background_message(&on_message);
    on_message.forget();

    let on_click = Closure::<dyn FnMut(web_sys::NotificationEvent)>::new(on_notification_click);
    scope().add_event_listener_with_callback("notificationclick", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    log::info!("[Background] Delivery handlers installed");
    Ok(true)
}

fn on_background_message(handler: &RefCell<BackgroundHandler>, value: JsValue) {
    let payload: PushPayload = match serde_wasm_bindgen::from_value(value) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("[Background] Ignoring malformed message: {e}");
            return;
        }
    };

    let Decision::Display(request) = handler.borrow_mut().handle(&payload, now_ms()) else {
        return;
    };

    let registration = scope().registration();
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = show_on_registration(&registration, &request).await {
            log::error!("[Background] Could not display notification: {e}");
        }
    });
}

fn on_notification_click(event: web_sys::NotificationEvent) {
    let notification = BrowserNotification(event.notification());
    let clients = WorkerClients(scope().clients());

    let routed = future_to_promise(async move {
        match handle_notification_click(&clients, &notification).await {
            Ok(outcome) => {
                log::debug!("[Background] Click routed: {outcome:?}");
                Ok(JsValue::UNDEFINED)
            }
            Err(e) => {
                log::error!("[Background] Click routing failed: {e}");
                Err(e.into())
            }
        }
    });
    if let Err(e) = event.wait_until(&routed) {
        log::warn!("[Background] waitUntil failed: {}", js_error_message(&e));
    }
}

struct BrowserNotification(web_sys::Notification);

impl ClickedNotification for BrowserNotification {
    fn close(&self) {
        self.0.close();
    }

    fn target_url(&self) -> Option<String> {
        let data = self.0.data();
        if data.is_undefined() || data.is_null() {
            return None;
        }
        Reflect::get(&data, &JsValue::from_str("url"))
            .ok()
            .and_then(|url| url.as_string())
    }
}

struct WorkerClients(web_sys::Clients);

async fn await_promise(promise: Result<js_sys::Promise, JsValue>, call: &str) -> Result<JsValue, PushError> {
    let promise = promise.map_err(|e| PushError::Navigation(format!("{call}: {}", js_error_message(&e))))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| PushError::Navigation(format!("{call}: {}", js_error_message(&e))))
}

#[async_trait(?Send)]
impl WindowClients for WorkerClients {
    type Client = web_sys::WindowClient;

    async fn match_windows(&self) -> Result<Vec<Self::Client>, PushError> {
        let options = web_sys::ClientQueryOptions::new();
        options.set_type(web_sys::ClientType::Window);
        options.set_include_uncontrolled(true);

        let list = await_promise(Ok(self.0.match_all_with_options(&options)), "clients.matchAll").await?;
        let list: js_sys::Array = list
            .dyn_into()
            .map_err(|_| PushError::Navigation("clients.matchAll did not return an array".into()))?;
        Ok(list
            .iter()
            .filter_map(|client| client.dyn_into::<web_sys::WindowClient>().ok())
            .collect())
    }

    async fn focus(&self, client: &Self::Client) -> Result<(), PushError> {
        await_promise(client.focus(), "client.focus").await.map(drop)
    }

    fn can_navigate(&self, client: &Self::Client) -> bool {
        Reflect::get(client, &JsValue::from_str("navigate"))
            .map(|f| f.is_function())
            .unwrap_or(false)
    }

    async fn navigate(&self, client: &Self::Client, url: &str) -> Result<(), PushError> {
        await_promise(client.navigate(url), "client.navigate").await.map(drop)
    }

    async fn open_window(&self, url: &str) -> Result<(), PushError> {
        await_promise(Ok(self.0.open_window(url)), "clients.openWindow").await.map(drop)
    }
}
