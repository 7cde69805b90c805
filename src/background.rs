//! Background delivery handler (service worker context).
//!
//! Runs in the worker global scope with its own [`DedupTable`]. Accepted
//! messages carry an OS tag per logical event and `renotify: false`, so once
//! the TTL has elapsed the platform still collapses repeats into the existing
//! notification instead of stacking a new one.
//!
//! # Click routing
//!
//! ```text
//! notificationclick
//!     ├─ close notification (always)
//!     ├─ open app window? ── focus ── navigate(url) ─► FocusedExisting
//!     │        └─ focus/navigate failed ─────────────┐
//!     └─ none ───────────────────────────────────────┴► openWindow(url)
//! ```

use async_trait::async_trait;

use crate::config::PushConfig;
use crate::dedup::DedupTable;
use crate::error::PushError;
use crate::foreground::{Decision, DisplayRequest, SuppressReason};
use crate::payload::{normalize, DisplayDefaults, PushPayload};

/// Per-worker handler state. Construct once when the worker starts.
#[derive(Debug)]
pub struct BackgroundHandler {
    dedup: DedupTable,
    defaults: DisplayDefaults,
    listener_attached: bool,
}

impl BackgroundHandler {
    /// Handler with the configured background TTL.
    pub fn new(config: &PushConfig) -> Self {
        Self {
            dedup: DedupTable::new(config.background_ttl()),
            defaults: DisplayDefaults::from(config),
            listener_attached: false,
        }
    }

    /// Claim the worker's message and click listeners. `true` only on the first call.
    pub fn attach(&mut self) -> bool {
        if self.listener_attached {
            return false;
        }
        self.listener_attached = true;
        true
    }

    /// Whether the listeners were already claimed.
    pub fn is_attached(&self) -> bool {
        self.listener_attached
    }

    /// Decide what to do with one message.
    pub fn handle(&mut self, payload: &PushPayload, now_ms: u64) -> Decision {
        let message = normalize(payload, &self.defaults);
        let signature = message.signature();

        if !self.dedup.accept(&signature, now_ms) {
            log::info!("[Background] Push deduplicated: {signature}");
            return Decision::Suppress(SuppressReason::Duplicate);
        }

        Decision::Display(DisplayRequest {
            tag: Some(message.tag()),
            renotify: false,
            title: message.title,
            body: message.body,
            url: message.url,
            icon: self.defaults.icon.clone(),
            signature: signature.to_string(),
        })
    }
}

/// The clicked notification.
pub trait ClickedNotification {
    /// Dismiss it.
    fn close(&self);
    /// Embedded `data.url`.
    fn target_url(&self) -> Option<String>;
}

/// Worker `clients` API.
#[async_trait(?Send)]
pub trait WindowClients {
    /// Window client handle.
    type Client;

    /// Open windows of the app, including uncontrolled ones.
    async fn match_windows(&self) -> Result<Vec<Self::Client>, PushError>;

    /// Focus a window.
    async fn focus(&self, client: &Self::Client) -> Result<(), PushError>;

    /// Whether `client` supports `navigate`.
    fn can_navigate(&self, client: &Self::Client) -> bool;

    /// Navigate a window to `url`.
    async fn navigate(&self, client: &Self::Client, url: &str) -> Result<(), PushError>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &str) -> Result<(), PushError>;
}

/// How a click was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An existing window was focused (and navigated when supported).
    FocusedExisting {
        /// Whether `navigate` was called.
        navigated: bool,
    },
    /// A single new window was opened.
    OpenedWindow,
}

/// Handle `notificationclick`.
///
/// The notification is closed before anything else. Failing to focus or
/// navigate an existing window is logged and falls back to opening one.
pub async fn handle_notification_click<W, N>(
    clients: &W,
    notification: &N,
) -> Result<ClickOutcome, PushError>
where
    W: WindowClients,
    N: ClickedNotification,
{
    notification.close();

    let url = notification
        .target_url()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "/".to_string());

    let windows = match clients.match_windows().await {
        Ok(windows) => windows,
        Err(e) => {
            log::warn!("[Background] Could not enumerate windows: {e}");
            Vec::new()
        }
    };

    if let Some(client) = windows.first() {
        match focus_and_navigate(clients, client, &url).await {
            Ok(navigated) => return Ok(ClickOutcome::FocusedExisting { navigated }),
            Err(e) => log::warn!("[Background] {e}, opening a new window instead"),
        }
    }

    clients
        .open_window(&url)
        .await
        .map_err(|e| PushError::Navigation(format!("openWindow({url}) failed: {e}")))?;
    Ok(ClickOutcome::OpenedWindow)
}

async fn focus_and_navigate<W: WindowClients>(
    clients: &W,
    client: &W::Client,
    url: &str,
) -> Result<bool, PushError> {
    clients
        .focus(client)
        .await
        .map_err(|e| PushError::Navigation(format!("focus failed: {e}")))?;

    if !clients.can_navigate(client) {
        return Ok(false);
    }
    clients
        .navigate(client, url)
        .await
        .map_err(|e| PushError::Navigation(format!("navigate failed: {e}")))?;
    Ok(true)
}
