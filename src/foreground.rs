//! Foreground message router (page context).
//!
//! Decides per provider message whether to display, then displays through the
//! worker registration when one exists (same look and click handling as the
//! background path) or through a page-level notification otherwise.
//!
//! The page-local [`DedupTable`] is independent of the worker's: a message
//! that reaches both contexts can be displayed once in each.

// Rust guideline compliant 2026-02

use async_trait::async_trait;
use serde::Serialize;

use crate::capability::PermissionValue;
use crate::config::PushConfig;
use crate::dedup::DedupTable;
use crate::error::PushError;
use crate::payload::{normalize, DisplayDefaults, PushPayload};

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRequest {
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Deep link opened on click (also embedded as `data.url`).
    pub url: String,
    /// OS collapse tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Whether a same-tag replacement alerts again.
    pub renotify: bool,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Dedup signature, for logging.
    #[serde(skip)]
    pub signature: String,
}

/// Why a message was not displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Same signature seen within the TTL.
    Duplicate,
    /// Notifications are not permitted in this context.
    PermissionNotGranted,
}

/// Router verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Show this notification.
    Display(DisplayRequest),
    /// Drop the message.
    Suppress(SuppressReason),
}

/// Per-page router state. Construct once at page startup.
#[derive(Debug)]
pub struct ForegroundRouter {
    dedup: DedupTable,
    defaults: DisplayDefaults,
    listener_attached: bool,
}

impl ForegroundRouter {
    /// Router with the configured foreground TTL.
    pub fn new(config: &PushConfig) -> Self {
        Self {
            dedup: DedupTable::new(config.foreground_ttl()),
            defaults: DisplayDefaults::from(config),
            listener_attached: false,
        }
    }

    /// Claim the provider subscription. `true` only on the first call.
    pub fn attach(&mut self) -> bool {
        if self.listener_attached {
            return false;
        }
        self.listener_attached = true;
        true
    }

    /// Whether the provider subscription was already claimed.
    pub fn is_attached(&self) -> bool {
        self.listener_attached
    }

    /// Decide what to do with one message.
    pub fn handle(&mut self, payload: &PushPayload, permission: PermissionValue, now_ms: u64) -> Decision {
        if permission != PermissionValue::Granted {
            log::warn!("[Foreground] Notifications not granted, dropping message");
            return Decision::Suppress(SuppressReason::PermissionNotGranted);
        }

        let message = normalize(payload, &self.defaults);
        let signature = message.signature();

        if !self.dedup.accept(&signature, now_ms) {
            log::info!("[Foreground] Push deduplicated: {signature}");
            return Decision::Suppress(SuppressReason::Duplicate);
        }

        Decision::Display(DisplayRequest {
            title: message.title,
            body: message.body,
            url: message.url,
            tag: None,
            renotify: false,
            icon: self.defaults.icon.clone(),
            signature: signature.to_string(),
        })
    }
}

/// Where a foreground notification ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChannel {
    /// Shown by the worker registration.
    Registration,
    /// Shown as a page-level notification.
    Page,
}

/// Side-effecting display step for the page.
#[async_trait(?Send)]
pub trait NotificationSurface {
    /// Worker registration handle.
    type Registration;

    /// Show through `registration.showNotification`.
    async fn show_via_registration(
        &self,
        registration: &Self::Registration,
        request: &DisplayRequest,
    ) -> Result<(), PushError>;

    /// Show a page-level notification whose click routes in-app.
    fn show_in_page(&self, request: &DisplayRequest) -> Result<(), PushError>;
}

/// Display `request`, preferring the worker registration.
pub async fn present<N: NotificationSurface>(
    surface: &N,
    registration: Option<&N::Registration>,
    request: &DisplayRequest,
) -> Result<DisplayChannel, PushError> {
    if let Some(registration) = registration {
        match surface.show_via_registration(registration, request).await {
            Ok(()) => return Ok(DisplayChannel::Registration),
            Err(e) => log::warn!("[Foreground] Registration display failed, falling back: {e}"),
        }
    }
    surface.show_in_page(request)?;
    Ok(DisplayChannel::Page)
}

/// Page window operations used on click.
pub trait PageNavigator {
    /// Focus the window.
    fn focus(&self) -> Result<(), PushError>;
    /// Navigate the current window.
    fn assign(&self, url: &str) -> Result<(), PushError>;
    /// Open `url` in a new tab.
    fn open_new(&self, url: &str) -> Result<(), PushError>;
}

/// How a page notification click was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClickOutcome {
    /// Current window navigated in place.
    Navigated,
    /// In-place navigation failed; a new tab was opened.
    OpenedNewTab,
}

/// Route a page-level notification click: focus, then navigate in place.
pub fn route_page_click<N: PageNavigator>(navigator: &N, url: &str) -> Result<PageClickOutcome, PushError> {
    let in_place = navigator.focus().and_then(|()| navigator.assign(url));
    match in_place {
        Ok(()) => Ok(PageClickOutcome::Navigated),
        Err(e) => {
            log::warn!("[Foreground] In-place navigation failed ({e}), opening a new tab");
            navigator
                .open_new(url)
                .map_err(|open_err| PushError::Navigation(open_err.to_string()))?;
            Ok(PageClickOutcome::OpenedNewTab)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn payload(title: &str, subject: &str) -> PushPayload {
        PushPayload::from_json(&format!(
            r#"{{"notification": {{"title": "{title}", "body": "b"}}, "data": {{"desafio_id": "{subject}"}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_attach_only_once() {
        let mut router = ForegroundRouter::new(&PushConfig::default());
        assert!(!router.is_attached());
        assert!(router.attach());
        assert!(!router.attach());
        assert!(router.is_attached());
    }

    #[test]
    fn test_display_carries_deep_link_and_no_tag() {
        let mut router = ForegroundRouter::new(&PushConfig::default());
        let Decision::Display(request) = router.handle(&payload("Hola", "42"), PermissionValue::Granted, 0)
        else {
            panic!("expected display");
        };
        assert_eq!(request.title, "Hola");
        assert_eq!(request.url, "/?open_desafio=42");
        assert_eq!(request.tag, None);
    }

    #[test]
    fn test_burst_is_deduplicated_within_six_seconds() {
        let mut router = ForegroundRouter::new(&PushConfig::default());
        let msg = payload("Hola", "42");

        assert!(matches!(router.handle(&msg, PermissionValue::Granted, 0), Decision::Display(_)));
        assert_eq!(
            router.handle(&msg, PermissionValue::Granted, 200),
            Decision::Suppress(SuppressReason::Duplicate)
        );
        assert!(matches!(
            router.handle(&msg, PermissionValue::Granted, 6_000),
            Decision::Display(_)
        ));
    }

    #[test]
    fn test_permission_not_granted_suppresses_without_recording() {
        let mut router = ForegroundRouter::new(&PushConfig::default());
        let msg = payload("Hola", "42");

        assert_eq!(
            router.handle(&msg, PermissionValue::Default, 0),
            Decision::Suppress(SuppressReason::PermissionNotGranted)
        );
        assert!(matches!(router.handle(&msg, PermissionValue::Granted, 1), Decision::Display(_)));
    }

    #[derive(Default)]
    struct FakeSurface {
        registration_fails: bool,
        log: RefCell<Vec<&'static str>>,
    }

    #[async_trait(?Send)]
    impl NotificationSurface for FakeSurface {
        type Registration = ();

        async fn show_via_registration(&self, _: &(), _: &DisplayRequest) -> Result<(), PushError> {
            self.log.borrow_mut().push("registration");
            if self.registration_fails {
                return Err(PushError::Navigation("showNotification rejected".into()));
            }
            Ok(())
        }

        fn show_in_page(&self, _: &DisplayRequest) -> Result<(), PushError> {
            self.log.borrow_mut().push("page");
            Ok(())
        }
    }

    fn request() -> DisplayRequest {
        let mut router = ForegroundRouter::new(&PushConfig::default());
        match router.handle(&payload("t", "1"), PermissionValue::Granted, 0) {
            Decision::Display(request) => request,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_present_prefers_registration() {
        let surface = FakeSurface::default();
        let channel = present(&surface, Some(&()), &request()).await.unwrap();
        assert_eq!(channel, DisplayChannel::Registration);
        assert_eq!(*surface.log.borrow(), vec!["registration"]);
    }

    #[tokio::test]
    async fn test_present_falls_back_to_page() {
        let surface = FakeSurface::default();
        assert_eq!(present(&surface, None, &request()).await.unwrap(), DisplayChannel::Page);

        let failing = FakeSurface {
            registration_fails: true,
            ..FakeSurface::default()
        };
        assert_eq!(
            present(&failing, Some(&()), &request()).await.unwrap(),
            DisplayChannel::Page
        );
        assert_eq!(*failing.log.borrow(), vec!["registration", "page"]);
    }

    #[derive(Default)]
    struct FakeNavigator {
        assign_fails: bool,
        calls: RefCell<Vec<String>>,
    }

    impl PageNavigator for FakeNavigator {
        fn focus(&self) -> Result<(), PushError> {
            self.calls.borrow_mut().push("focus".into());
            Ok(())
        }

        fn assign(&self, url: &str) -> Result<(), PushError> {
            self.calls.borrow_mut().push(format!("assign {url}"));
            if self.assign_fails {
                return Err(PushError::Navigation("blocked".into()));
            }
            Ok(())
        }

        fn open_new(&self, url: &str) -> Result<(), PushError> {
            self.calls.borrow_mut().push(format!("open {url}"));
            Ok(())
        }
    }

    #[test]
    fn test_page_click_navigates_in_place() {
        let nav = FakeNavigator::default();
        let outcome = route_page_click(&nav, "/?open_desafio=42").unwrap();
        assert_eq!(outcome, PageClickOutcome::Navigated);
        assert_eq!(*nav.calls.borrow(), vec!["focus", "assign /?open_desafio=42"]);
    }

    #[test]
    fn test_page_click_falls_back_to_new_tab() {
        let nav = FakeNavigator {
            assign_fails: true,
            ..FakeNavigator::default()
        };
        let outcome = route_page_click(&nav, "/").unwrap();
        assert_eq!(outcome, PageClickOutcome::OpenedNewTab);
        assert_eq!(nav.calls.borrow().last().map(String::as_str), Some("open /"));
    }
}
