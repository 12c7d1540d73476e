use async_trait::async_trait;
use vault_client::{DatabaseCredentials, TokenInfo, VaultClient, VaultError};

/// The two Vault calls the load generator makes
#[async_trait]
pub trait SecretsBackend: Send + Sync + 'static {
    /// Exchange the local identity token for a client token
    async fn login(&self) -> Result<TokenInfo, VaultError>;

    /// Request one set of dynamic database credentials
    async fn read_database_credentials(
        &self,
        token: &str,
        role: &str,
    ) -> Result<DatabaseCredentials, VaultError>;
}

#[async_trait]
impl SecretsBackend for VaultClient {
    async fn login(&self) -> Result<TokenInfo, VaultError> {
        VaultClient::login(self).await
    }

    async fn read_database_credentials(
        &self,
        token: &str,
        role: &str,
    ) -> Result<DatabaseCredentials, VaultError> {
        VaultClient::read_database_credentials(self, token, role).await
    }
}
