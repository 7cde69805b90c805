//! Browser tests. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use ranking_push_wasm::foreground::DisplayRequest;
use ranking_push_wasm::storage::{DeviceRegistration, DurableState, KeyValueStore};
use ranking_push_wasm::web::service_worker::notification_options;
use ranking_push_wasm::web::storage::LocalStorage;
use ranking_push_wasm::web::{now_ms, page::PushClient};
use ranking_push_wasm::PushConfig;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_ping() {
    assert!(ranking_push_wasm::ping().starts_with("ranking-push-wasm"));
}

#[wasm_bindgen_test]
fn test_clock_is_epoch_millis() {
    assert!(now_ms() > 1_600_000_000_000);
}

#[wasm_bindgen_test]
fn test_local_storage_round_trip() {
    let store = LocalStorage::open().unwrap();
    store.set("push_test_key", "value").unwrap();
    assert_eq!(store.get("push_test_key").as_deref(), Some("value"));
    store.remove("push_test_key").unwrap();
    assert_eq!(store.get("push_test_key"), None);
}

#[wasm_bindgen_test]
fn test_registration_record_survives_reopen() {
    let keys = PushConfig::default().storage;
    let state = DurableState::new(LocalStorage::open().unwrap(), keys.clone());
    state
        .save_device_registration(&DeviceRegistration {
            token: "tok-web".into(),
            registered: true,
        })
        .unwrap();

    let reopened = DurableState::new(LocalStorage::open().unwrap(), keys.clone());
    assert!(!reopened.needs_registration("tok-web"));

    reopened.store().remove(&keys.last_token).unwrap();
    reopened.store().remove(&keys.registered_once).unwrap();
}

#[wasm_bindgen_test]
fn test_notification_options_embed_deep_link() {
    let request = DisplayRequest {
        title: "Nuevo desafío".into(),
        body: "Juan te desafió".into(),
        url: "/?open_desafio=42".into(),
        tag: Some("nuevo-42".into()),
        renotify: false,
        icon: None,
        signature: String::new(),
    };
    let options: JsValue = notification_options(&request).unwrap().into();

    let data = js_sys::Reflect::get(&options, &"data".into()).unwrap();
    let url = js_sys::Reflect::get(&data, &"url".into()).unwrap();
    assert_eq!(url.as_string().as_deref(), Some("/?open_desafio=42"));
    let tag = js_sys::Reflect::get(&options, &"tag".into()).unwrap();
    assert_eq!(tag.as_string().as_deref(), Some("nuevo-42"));
}

#[wasm_bindgen_test]
fn test_client_requires_vapid_key() {
    let config = js_sys::JSON::parse(r#"{"api_url": "https://api.example", "vapid_key": ""}"#).unwrap();
    let result = PushClient::new(config);
    assert!(result.is_err());
}
