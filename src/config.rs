//! Push layer configuration.
//!
//! Defaults are baked in at build time from `PUSH_API_URL` and
//! `PUSH_VAPID_KEY`; the host page overrides any field at runtime by passing
//! a (partial) JS object or JSON string.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PushError;

/// Default service worker script served at the site root.
pub const DEFAULT_SERVICE_WORKER_PATH: &str = "/firebase-messaging-sw.js";

/// Default push scope for the service worker.
pub const DEFAULT_SERVICE_WORKER_SCOPE: &str = "/";

/// Foreground duplicates usually arrive in a tight burst.
pub const DEFAULT_FOREGROUND_DEDUP_TTL_MS: u64 = 6_000;

/// Longer than the foreground window to absorb worker wake-up latency.
pub const DEFAULT_BACKGROUND_DEDUP_TTL_MS: u64 = 8_000;

/// Names of the durable client storage entries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StorageKeys {
    /// Session credential sent as the bearer token.
    pub session: String,
    /// Last token value registered with the backend.
    pub last_token: String,
    /// "Registered at least once" flag.
    pub registered_once: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            session: "token".to_string(),
            last_token: "last_fcm_token".to_string(),
            registered_once: "push_registered_once".to_string(),
        }
    }
}

/// Configuration shared by the page and worker contexts.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PushConfig {
    /// Backend base URL (no trailing slash).
    pub api_url: String,
    /// Public key used to mint provider tokens.
    pub vapid_key: String,
    /// Worker script URL.
    pub service_worker_path: String,
    /// Push scope the worker is registered under.
    pub service_worker_scope: String,
    /// Page-context dedup window.
    pub foreground_dedup_ttl_ms: u64,
    /// Worker-context dedup window.
    pub background_dedup_ttl_ms: u64,
    /// Title used when a payload carries none.
    pub default_title: String,
    /// Body used when a payload carries none.
    pub default_body: String,
    /// Optional notification icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Storage key names.
    pub storage: StorageKeys,
    /// Provider SDK app options, used when the host has not initialized it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase: Option<serde_json::Value>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            api_url: option_env!("PUSH_API_URL").unwrap_or_default().to_string(),
            vapid_key: option_env!("PUSH_VAPID_KEY").unwrap_or_default().to_string(),
            service_worker_path: DEFAULT_SERVICE_WORKER_PATH.to_string(),
            service_worker_scope: DEFAULT_SERVICE_WORKER_SCOPE.to_string(),
            foreground_dedup_ttl_ms: DEFAULT_FOREGROUND_DEDUP_TTL_MS,
            background_dedup_ttl_ms: DEFAULT_BACKGROUND_DEDUP_TTL_MS,
            default_title: "Ranking Pádel".to_string(),
            default_body: "Tenés una nueva notificación".to_string(),
            icon: None,
            storage: StorageKeys::default(),
            firebase: None,
        }
    }
}

impl PushConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid push config JSON")?;
        Ok(config.normalized())
    }

    /// Trim surrounding whitespace and the trailing slash of `api_url`.
    pub fn normalized(mut self) -> Self {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        self.vapid_key = self.vapid_key.trim().to_string();
        self
    }

    /// Check the settings token operations depend on.
    ///
    /// The worker context never calls this: it only displays and routes.
    pub fn validate_for_registration(&self) -> Result<(), PushError> {
        if self.vapid_key.is_empty() {
            return Err(PushError::Config("missing vapid_key (PUSH_VAPID_KEY)".into()));
        }
        if self.api_url.is_empty() {
            return Err(PushError::Config("missing api_url (PUSH_API_URL)".into()));
        }
        Ok(())
    }

    /// Page-context dedup TTL.
    pub fn foreground_ttl(&self) -> Duration {
        Duration::from_millis(self.foreground_dedup_ttl_ms)
    }

    /// Worker-context dedup TTL.
    pub fn background_ttl(&self) -> Duration {
        Duration::from_millis(self.background_dedup_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PushConfig::default();
        assert_eq!(config.service_worker_path, "/firebase-messaging-sw.js");
        assert_eq!(config.service_worker_scope, "/");
        assert_eq!(config.foreground_ttl(), Duration::from_secs(6));
        assert_eq!(config.background_ttl(), Duration::from_secs(8));
        assert_eq!(config.storage.last_token, "last_fcm_token");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PushConfig::from_json(
            r#"{"api_url": "https://api.example.com/", "vapid_key": " BKey ", "foreground_dedup_ttl_ms": 1500}"#,
        )
        .expect("parse config");

        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.vapid_key, "BKey");
        assert_eq!(config.foreground_dedup_ttl_ms, 1500);
        assert_eq!(config.background_dedup_ttl_ms, DEFAULT_BACKGROUND_DEDUP_TTL_MS);
        assert_eq!(config.storage, StorageKeys::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = PushConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("Invalid push config JSON"));
    }

    #[test]
    fn test_validate_requires_vapid_key_and_api_url() {
        let mut config = PushConfig {
            api_url: "https://api.example.com".into(),
            vapid_key: String::new(),
            ..PushConfig::default()
        };
        assert!(matches!(
            config.validate_for_registration(),
            Err(PushError::Config(msg)) if msg.contains("vapid_key")
        ));

        config.vapid_key = "BKey".into();
        config.api_url.clear();
        assert!(matches!(
            config.validate_for_registration(),
            Err(PushError::Config(msg)) if msg.contains("api_url")
        ));

        config.api_url = "https://api.example.com".into();
        assert!(config.validate_for_registration().is_ok());
    }
}
