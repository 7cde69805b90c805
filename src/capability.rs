//! Capability gate.
//!
//! Classifies whether this browser can receive push at all, and if so what
//! the permission state is. Pure: the caller supplies a [`PlatformSnapshot`]
//! and branches on the returned [`Classification`]. Nothing here fails.

use serde::{Deserialize, Serialize};

/// Shown when an iOS chat-app webview opens the app.
pub const OPEN_IN_SAFARI: &str =
    "This in-app browser cannot receive notifications. Open the app in Safari.";

/// Shown on iOS Safari outside an installed home-screen app.
pub const ADD_TO_HOME_SCREEN: &str =
    "On iPhone, notifications need the app installed: Share > Add to Home Screen, then open it from there.";

/// Shown when the notification, service worker or push APIs are missing.
pub const UNSUPPORTED_BROWSER: &str =
    "This browser does not support notifications. Open the app in Safari or Chrome.";

/// Shown after the user has blocked notifications.
pub const CHECK_SITE_SETTINGS: &str = "Notifications are blocked. iPhone: Settings > Notifications > (Safari/app). \
     Android: Site settings > Notifications.";

/// Push capability of the current environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushCapabilityState {
    /// Push cannot work here.
    Unsupported,
    /// The user blocked notifications. Terminal until they act outside the app.
    Denied,
    /// Supported, permission not requested yet.
    NeedsPermission,
    /// Supported and permitted.
    Granted,
}

/// Raw `Notification.permission` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionValue {
    /// Not asked yet.
    #[default]
    Default,
    /// Allowed.
    Granted,
    /// Blocked.
    Denied,
}

impl PermissionValue {
    /// Parse the platform string; anything unknown counts as `Default`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            _ => Self::Default,
        }
    }
}

/// Platform flags the gate reads.
#[derive(Debug, Clone, Default)]
pub struct PlatformSnapshot {
    /// `Notification` exists.
    pub notification_api: bool,
    /// `navigator.serviceWorker` exists.
    pub service_worker: bool,
    /// `PushManager` exists.
    pub push_manager: bool,
    /// Current permission.
    pub permission: PermissionValue,
    /// `navigator.userAgent`.
    pub user_agent: String,
    /// Running as an installed (home-screen) app.
    pub standalone: bool,
}

impl PlatformSnapshot {
    /// A fully capable browser with the given permission.
    pub fn supported(permission: PermissionValue) -> Self {
        Self {
            notification_api: true,
            service_worker: true,
            push_manager: true,
            permission,
            user_agent: String::new(),
            standalone: false,
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Capability state.
    pub state: PushCapabilityState,
    /// Present for `Unsupported` and `Denied`.
    pub remediation: Option<&'static str>,
}

impl Classification {
    fn new(state: PushCapabilityState, remediation: Option<&'static str>) -> Self {
        Self { state, remediation }
    }
}

const IOS_MARKERS: &[&str] = &["iPhone", "iPad", "iPod"];

// Chat and social app webviews; none of them can obtain push tokens on iOS.
const IN_APP_BROWSER_MARKERS: &[&str] = &[
    "FBAN",
    "FBAV",
    "FB_IAB",
    "Instagram",
    "WhatsApp",
    "Messenger",
    "MicroMessenger",
    "Line/",
    "Snapchat",
    "TikTok",
    "Twitter",
    "GSA/",
];

/// Whether the user agent is an iOS device.
pub fn is_ios(user_agent: &str) -> bool {
    IOS_MARKERS.iter().any(|m| user_agent.contains(m))
}

/// Whether the user agent is an app-embedded webview rather than a browser.
pub fn is_in_app_browser(user_agent: &str) -> bool {
    IN_APP_BROWSER_MARKERS.iter().any(|m| user_agent.contains(m))
}

/// Classify the environment.
pub fn classify(snapshot: &PlatformSnapshot) -> Classification {
    let ios = is_ios(&snapshot.user_agent);

    if ios && is_in_app_browser(&snapshot.user_agent) {
        return Classification::new(PushCapabilityState::Unsupported, Some(OPEN_IN_SAFARI));
    }

    if !(snapshot.notification_api && snapshot.service_worker && snapshot.push_manager) {
        let remediation = if ios && !snapshot.standalone {
            ADD_TO_HOME_SCREEN
        } else {
            UNSUPPORTED_BROWSER
        };
        return Classification::new(PushCapabilityState::Unsupported, Some(remediation));
    }

    match snapshot.permission {
        PermissionValue::Denied => {
            Classification::new(PushCapabilityState::Denied, Some(CHECK_SITE_SETTINGS))
        }
        PermissionValue::Default => Classification::new(PushCapabilityState::NeedsPermission, None),
        PermissionValue::Granted => Classification::new(PushCapabilityState::Granted, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
    const IOS_INSTAGRAM: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Mobile/15E148 Instagram 321.0.2.24.105";
    const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_permission_parse() {
        assert_eq!(PermissionValue::parse("granted"), PermissionValue::Granted);
        assert_eq!(PermissionValue::parse("denied"), PermissionValue::Denied);
        assert_eq!(PermissionValue::parse("default"), PermissionValue::Default);
        assert_eq!(PermissionValue::parse("prompt"), PermissionValue::Default);
    }

    #[test]
    fn test_granted_and_default_have_no_remediation() {
        let granted = classify(&PlatformSnapshot::supported(PermissionValue::Granted));
        assert_eq!(granted.state, PushCapabilityState::Granted);
        assert_eq!(granted.remediation, None);

        let fresh = classify(&PlatformSnapshot::supported(PermissionValue::Default));
        assert_eq!(fresh.state, PushCapabilityState::NeedsPermission);
        assert_eq!(fresh.remediation, None);
    }

    #[test]
    fn test_denied_points_to_site_settings() {
        let result = classify(&PlatformSnapshot::supported(PermissionValue::Denied));
        assert_eq!(result.state, PushCapabilityState::Denied);
        assert_eq!(result.remediation, Some(CHECK_SITE_SETTINGS));
    }

    #[test]
    fn test_ios_in_app_browser_is_unsupported_even_with_apis() {
        let snapshot = PlatformSnapshot {
            user_agent: IOS_INSTAGRAM.to_string(),
            ..PlatformSnapshot::supported(PermissionValue::Granted)
        };
        let result = classify(&snapshot);
        assert_eq!(result.state, PushCapabilityState::Unsupported);
        assert_eq!(result.remediation, Some(OPEN_IN_SAFARI));
    }

    #[test]
    fn test_ios_safari_tab_without_push_needs_install() {
        let snapshot = PlatformSnapshot {
            notification_api: false,
            push_manager: false,
            user_agent: IOS_SAFARI.to_string(),
            ..PlatformSnapshot::supported(PermissionValue::Default)
        };
        let result = classify(&snapshot);
        assert_eq!(result.state, PushCapabilityState::Unsupported);
        assert_eq!(result.remediation, Some(ADD_TO_HOME_SCREEN));
    }

    #[test]
    fn test_installed_ios_app_is_supported() {
        let snapshot = PlatformSnapshot {
            user_agent: IOS_SAFARI.to_string(),
            standalone: true,
            ..PlatformSnapshot::supported(PermissionValue::Default)
        };
        assert_eq!(classify(&snapshot).state, PushCapabilityState::NeedsPermission);
    }

    #[test]
    fn test_missing_service_worker_is_unsupported() {
        let snapshot = PlatformSnapshot {
            service_worker: false,
            user_agent: ANDROID_CHROME.to_string(),
            ..PlatformSnapshot::supported(PermissionValue::Granted)
        };
        let result = classify(&snapshot);
        assert_eq!(result.state, PushCapabilityState::Unsupported);
        assert_eq!(result.remediation, Some(UNSUPPORTED_BROWSER));
    }

    #[test]
    fn test_android_in_app_marker_alone_does_not_block() {
        // Only iOS webviews are known to lack tokens; Android webviews fail the API check instead.
        let snapshot = PlatformSnapshot {
            user_agent: format!("{ANDROID_CHROME} Instagram 321.0"),
            ..PlatformSnapshot::supported(PermissionValue::Granted)
        };
        assert_eq!(classify(&snapshot).state, PushCapabilityState::Granted);
    }
}
