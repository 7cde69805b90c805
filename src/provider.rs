//! Push provider SDK surface.
//!
//! Permission prompting and token minting are the only provider calls the
//! token lifecycle makes. Message subscription lives with the routers'
//! browser bindings, since each context subscribes differently.

use async_trait::async_trait;

use crate::capability::{PermissionValue, PlatformSnapshot};
use crate::error::PushError;

/// Push provider as seen from the page context.
#[async_trait(?Send)]
pub trait PushProvider {
    /// Worker registration handle the provider mints tokens against.
    type Registration;

    /// Current platform flags and permission.
    fn platform(&self) -> PlatformSnapshot;

    /// Prompt the user. Blocks on user interaction; main thread only.
    async fn request_permission(&self) -> PermissionValue;

    /// Mint a token for `registration`, keyed by the public `vapid_key`.
    ///
    /// Failures are `PushError::ProviderToken`.
    async fn mint_token(
        &self,
        vapid_key: &str,
        registration: &Self::Registration,
    ) -> Result<String, PushError>;
}
