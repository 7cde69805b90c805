//! WebAssembly push notification layer for the Ranking Pádel web app.
//!
//! Gates push on platform capability, registers the device token with the
//! backend at most once per token value, shows incoming messages without
//! duplicates in both the page and the service worker, and routes clicks
//! into the app through a single deep-link convention.
//!
//! # Contexts
//!
//! ```text
//! Page (PushClient)                           Service worker
//! ──────────────────────────────────────────────────────────────────────
//! capability gate
//! RegistrationManager ── register(sw.js) ──► startBackgroundDelivery()
//! TokenLifecycle
//!   mint token ─► POST /push/token
//!
//! provider onMessage                          provider onBackgroundMessage
//!   ForegroundRouter (dedup 6s)                 BackgroundHandler (dedup 8s)
//!   showNotification / Notification             showNotification(tag, renotify: false)
//!                                             notificationclick
//!                                               focus + navigate | openWindow
//!              ◄──────── /?open_desafio=<id> ────────
//! deep-link watcher (load, focus, popstate)
//!   strip param, pendingOpen(id)
//! ```
//!
//! Everything outside [`web`] is plain Rust and runs natively under test;
//! [`web`] binds the traits declared here to `web-sys` and the provider SDK.

// Rust guideline compliant 2026-02

pub mod background;
pub mod backend;
pub mod capability;
pub mod config;
pub mod dedup;
pub mod deeplink;
pub mod error;
pub mod foreground;
pub mod payload;
pub mod provider;
pub mod registration;
pub mod storage;
pub mod token;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use background::{handle_notification_click, BackgroundHandler, ClickOutcome};
pub use capability::{classify, Classification, PermissionValue, PlatformSnapshot, PushCapabilityState};
pub use config::PushConfig;
pub use dedup::DedupTable;
pub use deeplink::{resolve, DeepLinkTarget, PageLocation, PendingOpen};
pub use error::PushError;
pub use foreground::{Decision, DisplayRequest, ForegroundRouter, SuppressReason};
pub use payload::{normalize, InboundMessage, NotificationSignature, PushPayload};
pub use token::{AutoRegisterOutcome, AutoRegisterReport, NotRegisteredReason, TokenLifecycle};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Initialize the WASM module (page and worker alike).
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    console_error_panic_hook::set_once();
    web::console::init(log::LevelFilter::Info);
}

/// Test function to verify WASM loads correctly.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn ping() -> String {
    format!("ranking-push-wasm {} loaded", env!("CARGO_PKG_VERSION"))
}
