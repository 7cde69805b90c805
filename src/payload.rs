//! Inbound push payloads.
//!
//! Providers deliver title and body either under `notification` or under
//! `data`, and the subject id as a string or a number. Everything downstream
//! works on the single normalized [`InboundMessage`] shape.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::PushConfig;
use crate::deeplink::deep_link_url;

/// `notification` block of a provider message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFields {
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Body.
    #[serde(default)]
    pub body: Option<String>,
}

/// `data` block of a provider message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadData {
    /// Title alias.
    #[serde(default)]
    pub title: Option<String>,
    /// Body alias.
    #[serde(default)]
    pub body: Option<String>,
    /// Subject (challenge) id, string or number.
    #[serde(default)]
    pub desafio_id: Option<serde_json::Value>,
    /// Event kind.
    #[serde(default, alias = "type", alias = "event")]
    pub kind: Option<String>,
    /// Anything else the backend attached.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A provider message as delivered to either context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    /// Display block.
    #[serde(default)]
    pub notification: Option<NotificationFields>,
    /// Data block.
    #[serde(default)]
    pub data: Option<PayloadData>,
    /// Provider message id.
    #[serde(default, rename = "messageId", alias = "fcmMessageId")]
    pub message_id: Option<String>,
}

impl PushPayload {
    /// Parse a JSON payload.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Display defaults applied during normalization.
#[derive(Debug, Clone)]
pub struct DisplayDefaults {
    /// Fallback title.
    pub title: String,
    /// Fallback body.
    pub body: String,
    /// Optional icon.
    pub icon: Option<String>,
}

impl From<&PushConfig> for DisplayDefaults {
    fn from(config: &PushConfig) -> Self {
        Self {
            title: config.default_title.clone(),
            body: config.default_body.clone(),
            icon: config.icon.clone(),
        }
    }
}

/// Dedup key derived from (event kind, subject id, title, body).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationSignature(String);

impl NotificationSignature {
    /// Signature as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Event kind (`desafio` when a subject is present, `general` otherwise, unless given).
    pub event_kind: String,
    /// Subject id, if any.
    pub subject_id: Option<String>,
    /// Title to display.
    pub title: String,
    /// Body to display.
    pub body: String,
    /// In-app deep link.
    pub url: String,
}

impl InboundMessage {
    /// Deterministic dedup key.
    pub fn signature(&self) -> NotificationSignature {
        NotificationSignature(format!(
            "{}::{}::{}::{}",
            self.event_kind,
            self.subject_id.as_deref().unwrap_or_default(),
            self.title,
            self.body
        ))
    }

    /// OS-level notification tag; one per logical event.
    pub fn tag(&self) -> String {
        match &self.subject_id {
            Some(subject) => format!("{}-{}", self.event_kind, subject),
            None => self.event_kind.clone(),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn subject_from(value: &serde_json::Value) -> Option<String> {
    let subject = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!subject.is_empty()).then_some(subject)
}

/// Normalize any payload variant into an [`InboundMessage`].
pub fn normalize(payload: &PushPayload, defaults: &DisplayDefaults) -> InboundMessage {
    let notification = payload.notification.as_ref();
    let data = payload.data.as_ref();

    let title = non_blank(notification.and_then(|n| n.title.as_ref()))
        .or_else(|| non_blank(data.and_then(|d| d.title.as_ref())))
        .unwrap_or_else(|| defaults.title.clone());
    let body = non_blank(notification.and_then(|n| n.body.as_ref()))
        .or_else(|| non_blank(data.and_then(|d| d.body.as_ref())))
        .unwrap_or_else(|| defaults.body.clone());

    let subject_id = data
        .and_then(|d| d.desafio_id.as_ref())
        .and_then(subject_from);

    let event_kind = non_blank(data.and_then(|d| d.kind.as_ref())).unwrap_or_else(|| {
        if subject_id.is_some() {
            "desafio".to_string()
        } else {
            "general".to_string()
        }
    });

    let url = subject_id
        .as_deref()
        .map_or_else(|| "/".to_string(), deep_link_url);

    InboundMessage {
        event_kind,
        subject_id,
        title,
        body,
        url,
    }
}
