//! Page-side `web-sys` adapters: the service worker container, notification
//! display and window navigation.

use async_trait::async_trait;
use js_sys::Reflect;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::error::PushError;
use crate::foreground::{route_page_click, DisplayRequest, NotificationSurface, PageNavigator};
use crate::registration::ServiceWorkerContainer;

use super::{js_error_message, to_js};

/// `navigator.serviceWorker`, if the browser has one.
#[derive(Clone)]
pub struct BrowserServiceWorkers {
    container: Option<web_sys::ServiceWorkerContainer>,
}

impl BrowserServiceWorkers {
    /// Look up the container on the current window.
    pub fn detect() -> Self {
        let container = web_sys::window().and_then(|window| {
            let navigator = JsValue::from(window.navigator());
            let value = Reflect::get(&navigator, &JsValue::from_str("serviceWorker")).ok()?;
            if value.is_undefined() || value.is_null() {
                return None;
            }
            value.dyn_into::<web_sys::ServiceWorkerContainer>().ok()
        });
        Self { container }
    }

    fn container(&self) -> Result<&web_sys::ServiceWorkerContainer, PushError> {
        self.container
            .as_ref()
            .ok_or_else(|| PushError::unsupported("This browser does not support Service Workers"))
    }
}

fn into_registration(value: JsValue, call: &str) -> Result<web_sys::ServiceWorkerRegistration, PushError> {
    value
        .dyn_into::<web_sys::ServiceWorkerRegistration>()
        .map_err(|_| PushError::unsupported(format!("Unexpected return value from {call}")))
}

#[async_trait(?Send)]
impl ServiceWorkerContainer for BrowserServiceWorkers {
    type Registration = web_sys::ServiceWorkerRegistration;

    fn is_supported(&self) -> bool {
        self.container.is_some()
    }

    async fn registration_for(&self, scope: &str) -> Result<Option<Self::Registration>, PushError> {
        let container = self.container()?;
        match JsFuture::from(container.get_registration_with_document_url(scope)).await {
            Ok(value) if value.is_undefined() || value.is_null() => Ok(None),
            Ok(value) => into_registration(value, "serviceWorker.getRegistration").map(Some),
            Err(e) => {
                log::warn!("[ServiceWorker] getRegistration failed: {}", js_error_message(&e));
                Ok(None)
            }
        }
    }

    async fn register(&self, script_url: &str, scope: &str) -> Result<Self::Registration, PushError> {
        let container = self.container()?;
        let options = web_sys::RegistrationOptions::new();
        options.set_scope(scope);

        let value = JsFuture::from(container.register_with_options(script_url, &options))
            .await
            .map_err(|e| PushError::unsupported(js_error_message(&e)))?;
        into_registration(value, "serviceWorker.register")
    }

    async fn ready(&self) -> Result<Self::Registration, PushError> {
        let container = self.container()?;
        let promise = container
            .ready()
            .map_err(|e| PushError::unsupported(js_error_message(&e)))?;
        let value = JsFuture::from(promise)
            .await
            .map_err(|e| PushError::unsupported(js_error_message(&e)))?;
        into_registration(value, "serviceWorker.ready")
    }
}

#[derive(Serialize)]
struct NotificationData<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct NotificationOptionsJs<'a> {
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    renotify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    data: NotificationData<'a>,
}

/// `NotificationOptions` for a request, with the deep link under `data.url`.
pub fn notification_options(request: &DisplayRequest) -> Result<web_sys::NotificationOptions, JsValue> {
    let options = NotificationOptionsJs {
        body: &request.body,
        tag: request.tag.as_deref(),
        renotify: request.renotify,
        icon: request.icon.as_deref(),
        data: NotificationData { url: &request.url },
    };
    Ok(to_js(&options)?.unchecked_into())
}

/// Show `request` through a worker registration.
pub async fn show_on_registration(
    registration: &web_sys::ServiceWorkerRegistration,
    request: &DisplayRequest,
) -> Result<(), PushError> {
    let options = notification_options(request).map_err(|e| PushError::Navigation(js_error_message(&e)))?;
    let promise = registration
        .show_notification_with_options(&request.title, &options)
        .map_err(|e| PushError::Navigation(js_error_message(&e)))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| PushError::Navigation(format!("showNotification: {}", js_error_message(&e))))?;
    Ok(())
}

/// Page-context notification display.
#[derive(Clone, Copy, Default)]
pub struct PageNotifications;

#[async_trait(?Send)]
impl NotificationSurface for PageNotifications {
    type Registration = web_sys::ServiceWorkerRegistration;

    async fn show_via_registration(
        &self,
        registration: &Self::Registration,
        request: &DisplayRequest,
    ) -> Result<(), PushError> {
        show_on_registration(registration, request).await
    }

    fn show_in_page(&self, request: &DisplayRequest) -> Result<(), PushError> {
        let options = notification_options(request).map_err(|e| PushError::Navigation(js_error_message(&e)))?;
        let notification = web_sys::Notification::new_with_options(&request.title, &options)
            .map_err(|e| PushError::Navigation(format!("new Notification: {}", js_error_message(&e))))?;

        let url = request.url.clone();
        let handle = notification.clone();
        let onclick = Closure::<dyn FnMut()>::new(move || {
            if let Err(e) = route_page_click(&WindowNavigator, &url) {
                log::error!("[Foreground] Click routing failed: {e}");
            }
            handle.close();
        });
        notification.set_onclick(Some(onclick.as_ref().unchecked_ref()));
        onclick.forget();
        Ok(())
    }
}

/// The current window.
#[derive(Clone, Copy, Default)]
pub struct WindowNavigator;

fn window() -> Result<web_sys::Window, PushError> {
    web_sys::window().ok_or_else(|| PushError::Navigation("no window".into()))
}

impl PageNavigator for WindowNavigator {
    fn focus(&self) -> Result<(), PushError> {
        window()?
            .focus()
            .map_err(|e| PushError::Navigation(js_error_message(&e)))
    }

    fn assign(&self, url: &str) -> Result<(), PushError> {
        window()?
            .location()
            .assign(url)
            .map_err(|e| PushError::Navigation(js_error_message(&e)))
    }

    fn open_new(&self, url: &str) -> Result<(), PushError> {
        match window()?.open_with_url_and_target(url, "_blank") {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(PushError::Navigation("window.open was blocked".into())),
            Err(e) => Err(PushError::Navigation(js_error_message(&e))),
        }
    }
}
