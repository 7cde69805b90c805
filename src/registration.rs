//! Service worker registration manager.
//!
//! Guarantees one worker registration per push scope and that a freshly
//! registered worker is ready before anyone requests a token against it.
//! Registration failures are terminal: a browser that rejected the script
//! once will reject it again with the same inputs.

use async_trait::async_trait;
use std::cell::RefCell;

use crate::config::PushConfig;
use crate::error::PushError;

/// Platform service worker container (`navigator.serviceWorker`).
#[async_trait(?Send)]
pub trait ServiceWorkerContainer {
    /// Registration handle type.
    type Registration: Clone;

    /// Whether service workers exist in this context at all.
    fn is_supported(&self) -> bool;

    /// Existing registration controlling `scope`, if any.
    async fn registration_for(&self, scope: &str) -> Result<Option<Self::Registration>, PushError>;

    /// Register `script_url` under `scope`.
    async fn register(&self, script_url: &str, scope: &str) -> Result<Self::Registration, PushError>;

    /// Resolve once an active worker controls the scope.
    async fn ready(&self) -> Result<Self::Registration, PushError>;
}

/// Owns the single registration for one execution context.
pub struct RegistrationManager<C: ServiceWorkerContainer> {
    container: C,
    script_url: String,
    scope: String,
    cached: RefCell<Option<C::Registration>>,
}

impl<C: ServiceWorkerContainer> RegistrationManager<C> {
    /// Create a manager for the configured worker script and scope.
    pub fn new(container: C, config: &PushConfig) -> Self {
        Self {
            container,
            script_url: config.service_worker_path.clone(),
            scope: config.service_worker_scope.clone(),
            cached: RefCell::new(None),
        }
    }

    /// Underlying container.
    pub fn container(&self) -> &C {
        &self.container
    }

    /// Registration acquired so far, without touching the platform.
    pub fn current(&self) -> Option<C::Registration> {
        self.cached.borrow().clone()
    }

    /// Registration for the push scope if one already exists.
    ///
    /// Looks it up on the platform when nothing is cached yet, but never
    /// registers. A failed lookup counts as no registration.
    pub async fn active_registration(&self) -> Option<C::Registration> {
        if let Some(registration) = self.current() {
            return Some(registration);
        }
        if !self.container.is_supported() {
            return None;
        }

        match self.container.registration_for(&self.scope).await {
            Ok(Some(existing)) => {
                *self.cached.borrow_mut() = Some(existing.clone());
                Some(existing)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("[ServiceWorker] Registration lookup failed: {e}");
                None
            }
        }
    }

    /// Return the registration for the push scope, creating it if needed.
    ///
    /// Idempotent. A new registration is only returned after the platform's
    /// ready signal, so a token request cannot race the worker's install.
    pub async fn ensure_registration(&self) -> Result<C::Registration, PushError> {
        if let Some(registration) = self.current() {
            return Ok(registration);
        }

        if !self.container.is_supported() {
            return Err(PushError::unsupported(
                "This browser does not support Service Workers",
            ));
        }

        if let Some(existing) = self.container.registration_for(&self.scope).await? {
            log::debug!("[ServiceWorker] Reusing registration for scope {}", self.scope);
            *self.cached.borrow_mut() = Some(existing.clone());
            return Ok(existing);
        }

        log::info!(
            "[ServiceWorker] Registering {} (scope {})",
            self.script_url,
            self.scope
        );
        let registration = self
            .container
            .register(&self.script_url, &self.scope)
            .await
            .map_err(|e| PushError::unsupported(format!("Service worker registration failed: {e}")))?;

        // Not fatal: the registration exists, ready only narrows the install race.
        if let Err(e) = self.container.ready().await {
            log::warn!("[ServiceWorker] ready signal failed: {e}");
        }

        *self.cached.borrow_mut() = Some(registration.clone());
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::PushCapabilityState;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeContainer {
        unsupported: bool,
        existing: Option<u32>,
        fail_register: bool,
        fail_ready: bool,
        lookups: Cell<u32>,
        registers: Cell<u32>,
        readies: Cell<u32>,
    }

    #[async_trait(?Send)]
    impl ServiceWorkerContainer for FakeContainer {
        type Registration = u32;

        fn is_supported(&self) -> bool {
            !self.unsupported
        }

        async fn registration_for(&self, _scope: &str) -> Result<Option<u32>, PushError> {
            self.lookups.set(self.lookups.get() + 1);
            Ok(self.existing)
        }

        async fn register(&self, _script_url: &str, _scope: &str) -> Result<u32, PushError> {
            self.registers.set(self.registers.get() + 1);
            if self.fail_register {
                return Err(PushError::Navigation("script fetch failed".into()));
            }
            Ok(7)
        }

        async fn ready(&self) -> Result<u32, PushError> {
            self.readies.set(self.readies.get() + 1);
            if self.fail_ready {
                return Err(PushError::Storage("ready rejected".into()));
            }
            Ok(7)
        }
    }

    fn manager(container: FakeContainer) -> RegistrationManager<FakeContainer> {
        RegistrationManager::new(container, &PushConfig::default())
    }

    #[tokio::test]
    async fn test_registers_once_and_waits_for_ready() {
        let manager = manager(FakeContainer::default());

        assert_eq!(manager.ensure_registration().await.unwrap(), 7);
        assert_eq!(manager.ensure_registration().await.unwrap(), 7);

        let container = manager.container();
        assert_eq!(container.registers.get(), 1);
        assert_eq!(container.readies.get(), 1);
        // Second call is served from the cache
        assert_eq!(container.lookups.get(), 1);
    }

    #[tokio::test]
    async fn test_reuses_existing_registration() {
        let manager = manager(FakeContainer {
            existing: Some(3),
            ..FakeContainer::default()
        });

        assert_eq!(manager.ensure_registration().await.unwrap(), 3);
        assert_eq!(manager.container().registers.get(), 0);
        assert_eq!(manager.current(), Some(3));
    }

    #[tokio::test]
    async fn test_active_registration_finds_existing_without_registering() {
        let manager = manager(FakeContainer {
            existing: Some(3),
            ..FakeContainer::default()
        });

        assert_eq!(manager.current(), None);
        assert_eq!(manager.active_registration().await, Some(3));
        assert_eq!(manager.active_registration().await, Some(3));
        assert_eq!(manager.container().lookups.get(), 1);
        assert_eq!(manager.container().registers.get(), 0);
    }

    #[tokio::test]
    async fn test_active_registration_does_not_register() {
        let manager = manager(FakeContainer::default());

        assert_eq!(manager.active_registration().await, None);
        assert_eq!(manager.container().registers.get(), 0);
        assert_eq!(manager.container().readies.get(), 0);
        assert_eq!(manager.current(), None);
    }

    #[tokio::test]
    async fn test_unsupported_is_capability_error() {
        let manager = manager(FakeContainer {
            unsupported: true,
            ..FakeContainer::default()
        });

        let err = manager.ensure_registration().await.unwrap_err();
        assert!(matches!(
            err,
            PushError::Capability {
                state: PushCapabilityState::Unsupported,
                ..
            }
        ));
        assert_eq!(manager.container().lookups.get(), 0);
    }

    #[tokio::test]
    async fn test_register_failure_is_terminal_capability_error() {
        let manager = manager(FakeContainer {
            fail_register: true,
            ..FakeContainer::default()
        });

        let err = manager.ensure_registration().await.unwrap_err();
        assert!(matches!(err, PushError::Capability { .. }));
        assert!(err.to_string().contains("script fetch failed"));
        assert!(!err.is_retryable());
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_ready_failure_is_not_fatal() {
        let manager = manager(FakeContainer {
            fail_ready: true,
            ..FakeContainer::default()
        });

        assert_eq!(manager.ensure_registration().await.unwrap(), 7);
        assert_eq!(manager.current(), Some(7));
    }
}
