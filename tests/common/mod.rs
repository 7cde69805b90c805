//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use ranking_push_wasm::backend::BackendClient;
use ranking_push_wasm::provider::PushProvider;
use ranking_push_wasm::registration::ServiceWorkerContainer;
use ranking_push_wasm::storage::{KeyValueStore, MemoryStore};
use ranking_push_wasm::{PermissionValue, PlatformSnapshot, PushConfig, PushError, TokenLifecycle};

pub const SESSION: &str = "session-abc";

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Provider whose permission, prompt answer and token are set by the test.
pub struct FakeProvider {
    pub snapshot: RefCell<PlatformSnapshot>,
    pub prompt_answer: Cell<PermissionValue>,
    pub token: RefCell<String>,
    pub fail_mint: Cell<bool>,
    pub mints: Cell<u32>,
    pub prompts: Cell<u32>,
}

impl FakeProvider {
    pub fn new(permission: PermissionValue) -> Self {
        Self {
            snapshot: RefCell::new(PlatformSnapshot::supported(permission)),
            prompt_answer: Cell::new(PermissionValue::Granted),
            token: RefCell::new("tok-1".to_string()),
            fail_mint: Cell::new(false),
            mints: Cell::new(0),
            prompts: Cell::new(0),
        }
    }

    pub fn rotate(&self, token: &str) {
        *self.token.borrow_mut() = token.to_string();
    }
}

#[async_trait(?Send)]
impl PushProvider for FakeProvider {
    type Registration = u32;

    fn platform(&self) -> PlatformSnapshot {
        self.snapshot.borrow().clone()
    }

    async fn request_permission(&self) -> PermissionValue {
        self.prompts.set(self.prompts.get() + 1);
        let answer = self.prompt_answer.get();
        self.snapshot.borrow_mut().permission = answer;
        answer
    }

    async fn mint_token(&self, vapid_key: &str, _registration: &u32) -> Result<String, PushError> {
        assert_eq!(vapid_key, "test-vapid-key");
        self.mints.set(self.mints.get() + 1);
        if self.fail_mint.get() {
            return Err(PushError::ProviderToken("messaging/token-subscribe-failed".into()));
        }
        Ok(self.token.borrow().clone())
    }
}

/// Container that always registers successfully.
#[derive(Default)]
pub struct FakeContainer {
    pub existing: Cell<Option<u32>>,
    pub registers: Cell<u32>,
}

#[async_trait(?Send)]
impl ServiceWorkerContainer for FakeContainer {
    type Registration = u32;

    fn is_supported(&self) -> bool {
        true
    }

    async fn registration_for(&self, _scope: &str) -> Result<Option<u32>, PushError> {
        Ok(self.existing.get())
    }

    async fn register(&self, _script_url: &str, _scope: &str) -> Result<u32, PushError> {
        self.registers.set(self.registers.get() + 1);
        Ok(7)
    }

    async fn ready(&self) -> Result<u32, PushError> {
        Ok(7)
    }
}

pub type TestLifecycle = TokenLifecycle<FakeProvider, FakeContainer, MemoryStore>;

pub fn config(api_url: &str) -> PushConfig {
    PushConfig {
        api_url: api_url.to_string(),
        vapid_key: "test-vapid-key".to_string(),
        ..PushConfig::default()
    }
}

/// Store with a logged-in session.
pub fn logged_in_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set("token", SESSION).unwrap();
    store
}

pub fn lifecycle(api_url: &str, provider: FakeProvider, store: MemoryStore) -> TestLifecycle {
    let config = config(api_url);
    let backend = BackendClient::new(reqwest::Client::new(), &config.api_url);
    TokenLifecycle::new(&config, provider, FakeContainer::default(), backend, store).unwrap()
}
