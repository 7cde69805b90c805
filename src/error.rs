//! Error taxonomy for push operations.
//!
//! Absence of capability is usually reported as a value (see
//! [`crate::capability::classify`]); `PushError::Capability` only appears when
//! an operation that *requires* capability is invoked anyway.

use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::capability::PushCapabilityState;

/// Push layer errors.
#[derive(Error, Debug)]
pub enum PushError {
    /// Unsupported platform or denied permission. Never retried by the app.
    #[error("{message}")]
    Capability {
        /// Capability state that blocked the operation.
        state: PushCapabilityState,
        /// Remediation text for the user.
        message: String,
    },
    /// The provider SDK failed to mint a token. Retry on a later invocation.
    #[error("Failed to obtain push token: {0}")]
    ProviderToken(String),
    /// Non-2xx from the token endpoint. `body` is the response text verbatim.
    #[error("Error registering token: {status} {body}")]
    BackendRegistration {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The backend request failed before a status was received.
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Click routing could not focus or navigate a window.
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// No session credential in durable storage.
    #[error("No active session, log in again")]
    NoSession,
    /// Durable storage rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Required configuration is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PushError {
    /// Shorthand for an unsupported-platform capability error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Capability {
            state: PushCapabilityState::Unsupported,
            message: message.into(),
        }
    }

    /// Shorthand for a denied-permission capability error.
    pub fn denied(message: impl Into<String>) -> Self {
        Self::Capability {
            state: PushCapabilityState::Denied,
            message: message.into(),
        }
    }

    /// Whether a later invocation with the same inputs may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderToken(_) | Self::Transport(_) => true,
            Self::BackendRegistration { status, .. } => *status != 401,
            _ => false,
        }
    }

    /// Whether the backend rejected the session credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::BackendRegistration { status: 401, .. })
    }
}

impl From<PushError> for JsValue {
    fn from(err: PushError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
