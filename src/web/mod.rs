//! Browser bindings.
//!
//! Implements the platform traits over `web-sys` and the provider's compat
//! SDK, and exports the JavaScript entry points: [`page::PushClient`] for the
//! page and [`worker::start_background_delivery`] for the service worker.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub mod console;
pub mod firebase;
pub mod page;
pub mod service_worker;
pub mod storage;
pub mod worker;

/// Milliseconds since the epoch, from `Date.now()`.
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Best-effort message from a rejected promise or thrown value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Serialize to a plain JS object (maps become objects, not `Map`).
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}
