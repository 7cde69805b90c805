//! Token lifecycle manager.
//!
//! Mints provider tokens and registers them with the backend at most once per
//! token value.
//!
//! # Idempotency
//!
//! ```text
//! auto_register_if_granted()
//!     │
//!     ├─ no session ──────────────► NotRegistered(NoSession)
//!     ├─ capability != Granted ───► NotRegistered(NeedPermission | Denied | Unsupported)
//!     │
//!     ├─ ensure worker registration
//!     ├─ mint current token
//!     ├─ token == stored && registered_once ─► NotRegistered(AlreadyRegistered)
//!     │
//!     └─ POST /push/token ─► persist { token, registered: true } ─► Registered(token)
//! ```
//!
//! Nothing here retries on its own. A 401 clears the stored session so the
//! app sends the user back through login.

use serde::Serialize;

use crate::backend::BackendClient;
use crate::capability::{classify, PermissionValue, PushCapabilityState, CHECK_SITE_SETTINGS};
use crate::config::PushConfig;
use crate::error::PushError;
use crate::provider::PushProvider;
use crate::registration::{RegistrationManager, ServiceWorkerContainer};
use crate::storage::{DeviceRegistration, DurableState, KeyValueStore};

/// Why [`TokenLifecycle::auto_register_if_granted`] did not register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotRegisteredReason {
    /// No session credential stored.
    NoSession,
    /// Permission was never requested; this variant does not prompt.
    NeedPermission,
    /// Permission denied.
    Denied,
    /// Platform cannot do push; carries the remediation message.
    Unsupported(String),
    /// The current token is already registered.
    AlreadyRegistered,
    /// Worker registration, token mint or backend call failed.
    Error(String),
}

impl NotRegisteredReason {
    /// Stable reason code exposed to JavaScript.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::NeedPermission => "need_permission",
            Self::Denied => "denied",
            Self::Unsupported(_) => "unsupported",
            Self::AlreadyRegistered => "already_registered",
            Self::Error(_) => "error",
        }
    }

    /// Human-readable detail, where there is one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Denied => Some(CHECK_SITE_SETTINGS),
            Self::Unsupported(msg) | Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Result of the non-prompting registration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoRegisterOutcome {
    /// The token was POSTed and acknowledged.
    Registered(String),
    /// Nothing was registered.
    NotRegistered(NotRegisteredReason),
}

impl AutoRegisterOutcome {
    /// Whether the device ends up registered (now or previously).
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            Self::Registered(_) | Self::NotRegistered(NotRegisteredReason::AlreadyRegistered)
        )
    }
}

/// Wire shape handed to the UI: `{ ok, token?, reason?, message? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoRegisterReport {
    /// Whether a registration happened.
    pub ok: bool,
    /// Registered token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Reason code when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Detail for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&AutoRegisterOutcome> for AutoRegisterReport {
    fn from(outcome: &AutoRegisterOutcome) -> Self {
        match outcome {
            AutoRegisterOutcome::Registered(token) => Self {
                ok: true,
                token: Some(token.clone()),
                reason: None,
                message: None,
            },
            AutoRegisterOutcome::NotRegistered(reason) => Self {
                ok: false,
                token: None,
                reason: Some(reason.code()),
                message: reason.message().map(str::to_string),
            },
        }
    }
}

/// Mints and registers device tokens for the page context.
pub struct TokenLifecycle<P, C, S>
where
    C: ServiceWorkerContainer,
{
    provider: P,
    registrations: RegistrationManager<C>,
    backend: BackendClient,
    state: DurableState<S>,
    vapid_key: String,
}

impl<P, C, S> TokenLifecycle<P, C, S>
where
    P: PushProvider<Registration = C::Registration>,
    C: ServiceWorkerContainer,
    S: KeyValueStore,
{
    /// Build a lifecycle manager. Fails when the public key or API URL is missing.
    pub fn new(
        config: &PushConfig,
        provider: P,
        container: C,
        backend: BackendClient,
        store: S,
    ) -> Result<Self, PushError> {
        config.validate_for_registration()?;
        Ok(Self {
            provider,
            registrations: RegistrationManager::new(container, config),
            backend,
            state: DurableState::new(store, config.storage.clone()),
            vapid_key: config.vapid_key.clone(),
        })
    }

    /// Push provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Worker registration manager for this context.
    pub fn registrations(&self) -> &RegistrationManager<C> {
        &self.registrations
    }

    /// Durable storage view.
    pub fn state(&self) -> &DurableState<S> {
        &self.state
    }

    /// Mint a provider token against `registration`.
    ///
    /// Requires `Granted`; never prompts.
    pub async fn obtain_token(&self, registration: &C::Registration) -> Result<String, PushError> {
        let classification = classify(&self.provider.platform());
        if classification.state != PushCapabilityState::Granted {
            return Err(PushError::Capability {
                state: classification.state,
                message: classification
                    .remediation
                    .unwrap_or("Notification permission not granted")
                    .to_string(),
            });
        }

        let token = self.provider.mint_token(&self.vapid_key, registration).await?;
        if token.is_empty() {
            return Err(PushError::ProviderToken("provider returned an empty token".into()));
        }
        Ok(token)
    }

    /// POST `token` for `session`. On 401 the stored session is cleared.
    pub async fn register_token(
        &self,
        session: &str,
        token: &str,
    ) -> Result<serde_json::Value, PushError> {
        match self.backend.register_token(session, token).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                if e.is_unauthorized() {
                    log::warn!("[Push] Session rejected by backend, clearing it");
                    if let Err(clear_err) = self.state.clear_session() {
                        log::error!("[Push] Failed to clear session: {clear_err}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Opportunistic, non-prompting registration (e.g. after login).
    pub async fn auto_register_if_granted(&self) -> AutoRegisterOutcome {
        let Some(session) = self.state.session() else {
            return AutoRegisterOutcome::NotRegistered(NotRegisteredReason::NoSession);
        };

        let classification = classify(&self.provider.platform());
        let reason = match classification.state {
            PushCapabilityState::Granted => None,
            PushCapabilityState::NeedsPermission => Some(NotRegisteredReason::NeedPermission),
            PushCapabilityState::Denied => Some(NotRegisteredReason::Denied),
            PushCapabilityState::Unsupported => Some(NotRegisteredReason::Unsupported(
                classification.remediation.unwrap_or_default().to_string(),
            )),
        };
        if let Some(reason) = reason {
            log::debug!("[Push] Auto-register skipped: {}", reason.code());
            return AutoRegisterOutcome::NotRegistered(reason);
        }

        let registration = match self.registrations.ensure_registration().await {
            Ok(registration) => registration,
            Err(PushError::Capability { message, .. }) => {
                return AutoRegisterOutcome::NotRegistered(NotRegisteredReason::Unsupported(message));
            }
            Err(e) => return AutoRegisterOutcome::NotRegistered(NotRegisteredReason::Error(e.to_string())),
        };

        let token = match self.obtain_token(&registration).await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("[Push] Auto-register could not mint a token: {e}");
                return AutoRegisterOutcome::NotRegistered(NotRegisteredReason::Error(e.to_string()));
            }
        };

        if !self.state.needs_registration(&token) {
            log::debug!("[Push] Token already registered, skipping backend call");
            return AutoRegisterOutcome::NotRegistered(NotRegisteredReason::AlreadyRegistered);
        }

        match self.register_and_persist(&session, &token).await {
            Ok(()) => AutoRegisterOutcome::Registered(token),
            Err(e) => AutoRegisterOutcome::NotRegistered(NotRegisteredReason::Error(e.to_string())),
        }
    }

    /// Explicit user action: prompt if needed, then register.
    ///
    /// Rejects without prompting when the platform is unsupported or the
    /// permission is already denied. A token that is already registered is
    /// returned without another backend call.
    pub async fn enable_and_register(&self) -> Result<String, PushError> {
        let session = self.state.session().ok_or(PushError::NoSession)?;

        let classification = classify(&self.provider.platform());
        match classification.state {
            PushCapabilityState::Unsupported => {
                return Err(PushError::unsupported(classification.remediation.unwrap_or_default()));
            }
            PushCapabilityState::Denied => return Err(PushError::denied(CHECK_SITE_SETTINGS)),
            PushCapabilityState::NeedsPermission => {
                let answer = self.provider.request_permission().await;
                if answer != PermissionValue::Granted {
                    log::info!("[Push] Permission prompt answered {answer:?}");
                    return Err(PushError::denied("Notification permission denied"));
                }
            }
            PushCapabilityState::Granted => {}
        }

        let registration = self.registrations.ensure_registration().await?;
        let token = self.obtain_token(&registration).await?;
        if !self.state.needs_registration(&token) {
            log::debug!("[Push] Token already registered, skipping backend call");
            return Ok(token);
        }
        self.register_and_persist(&session, &token).await?;
        Ok(token)
    }

    async fn register_and_persist(&self, session: &str, token: &str) -> Result<(), PushError> {
        self.register_token(session, token).await?;
        self.state.save_device_registration(&DeviceRegistration {
            token: token.to_string(),
            registered: true,
        })?;
        log::info!("[Push] Device token registered ({:.12}...)", token);
        Ok(())
    }
}
