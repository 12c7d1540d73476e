use thiserror::Error;
use vault_client::VaultError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Vault client setup failed: {0}")]
    Client(#[source] VaultError),

    #[error("Vault login failed: {0}")]
    Auth(#[source] VaultError),

    #[error("Read DB credential for role {role} failed: {source}")]
    Fetch {
        role: String,
        #[source]
        source: VaultError,
    },

    #[error("Concurrency limiter closed")]
    LimiterClosed,
}
