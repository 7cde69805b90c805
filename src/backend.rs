//! Backend client for device token registration.
//!
//! `POST {api_url}/push/token` with a bearer session and
//! `{ "fcm_token": "<token>" }`. Any 2xx is an acknowledgement; anything else
//! surfaces the response body verbatim.

use serde::Serialize;

use crate::error::PushError;

#[derive(Serialize)]
struct TokenRegistration<'a> {
    fcm_token: &'a str,
}

/// HTTP client for the token endpoint.
///
/// Reuse one instance; the inner `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    api_url: String,
}

impl BackendClient {
    /// Create a client for `api_url` (trailing slash ignored).
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Register `token` for the user behind `session`.
    ///
    /// Returns the parsed JSON acknowledgement (`Null` for an empty body).
    /// A 401 comes back as `BackendRegistration { status: 401, .. }`; clearing
    /// the stored session is the caller's job.
    pub async fn register_token(
        &self,
        session: &str,
        token: &str,
    ) -> Result<serde_json::Value, PushError> {
        let url = format!("{}/push/token", self.api_url);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(session)
            .json(&TokenRegistration { fcm_token: token });

        // ngrok's free tier serves an HTML interstitial unless told otherwise
        if self.api_url.contains("ngrok-free") {
            request = request.header("ngrok-skip-browser-warning", "true");
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = error_body(response.text().await);
            log::warn!("[Push] Token registration rejected: {} {}", status.as_u16(), body);
            return Err(PushError::BackendRegistration {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        if raw.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)))
    }
}

/// Body of a rejected request. An unreadable body is logged and reported empty.
fn error_body(read: Result<String, reqwest::Error>) -> String {
    read.unwrap_or_else(|e| {
        log::warn!("[Push] Could not read error response body: {e}");
        String::new()
    })
}
