pub(crate) mod kubernetes;
mod token_info;

pub use kubernetes::KubernetesAuth;
pub use token_info::TokenInfo;

use crate::VaultError;
use async_trait::async_trait;

/// Trait for authentication methods
#[async_trait]
pub trait AuthMethod: Send + Sync {
    /// Exchange local identity material for a fresh client token
    async fn authenticate(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<TokenInfo, VaultError>;
}
