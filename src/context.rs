use std::sync::Arc;

use crate::backend::SecretsBackend;
use crate::backlog::BacklogCounter;
use crate::config::RunConfig;
use crate::error::HarnessError;
use crate::limiter::Limiter;
use crate::session::SessionManager;
use crate::stats::RunStats;

/// Everything a run shares between the driver and its request tasks
pub struct RunContext<B> {
    pub config: RunConfig,
    pub backend: Arc<B>,
    pub session: SessionManager<B>,
    pub limiter: Limiter,
    pub backlog: BacklogCounter,
    pub stats: RunStats,
}

impl<B: SecretsBackend> RunContext<B> {
    /// Validate the config and log in. Fails before any request is sent.
    pub async fn establish(config: RunConfig, backend: Arc<B>) -> Result<Arc<Self>, HarnessError> {
        config.validate()?;

        tracing::info!(vault = %config.vault_addr, role = %config.auth_role, "Logging in to Vault");
        let session = SessionManager::establish(Arc::clone(&backend), config.renewal).await?;

        Ok(Arc::new(Self {
            limiter: Limiter::new(config.concurrency),
            backlog: BacklogCounter::new(),
            stats: RunStats::default(),
            config,
            backend,
            session,
        }))
    }
}
