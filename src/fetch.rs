use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::SecretsBackend;
use crate::config::FetchErrorPolicy;
use crate::context::RunContext;
use crate::error::HarnessError;

/// How a finished request is accounted for
pub enum Completion {
    /// Awaited by the batch that spawned it
    Batch,
    /// Decrements the backlog; fatal errors go to the control loop
    Backlog(mpsc::Sender<HarnessError>),
}

/// Acquire a slot, read one set of credentials, release the slot.
/// Only returns an error when the fetch-error policy is `Abort`.
pub async fn fetch_credentials<B: SecretsBackend>(ctx: &RunContext<B>) -> Result<(), HarnessError> {
    let role = &ctx.config.db_role;

    let permit = ctx.limiter.acquire().await?;
    let session = ctx.session.current();
    ctx.stats.record_issued();
    let result = ctx
        .backend
        .read_database_credentials(session.token(), role)
        .await;
    drop(permit);

    match result {
        Ok(creds) => {
            ctx.stats.record_success();
            tracing::trace!(lease_id = %creds.lease_id, username = %creds.username, "Read DB credential");
            Ok(())
        }
        Err(source) => {
            ctx.stats.record_failure();
            match ctx.config.fetch_error_policy {
                FetchErrorPolicy::Log => {
                    tracing::warn!(role = %role, error = %source, "Read DB credential failed");
                    Ok(())
                }
                FetchErrorPolicy::Abort => Err(HarnessError::Fetch {
                    role: role.clone(),
                    source,
                }),
            }
        }
    }
}

/// Run one request task and report its completion
pub async fn run_fetch<B: SecretsBackend>(
    ctx: Arc<RunContext<B>>,
    completion: Completion,
) -> Result<(), HarnessError> {
    let result = fetch_credentials(&ctx).await;

    match completion {
        Completion::Batch => result,
        Completion::Backlog(fatal) => {
            ctx.backlog.complete_one();
            if let Err(err) = result {
                // first error wins, later ones are dropped
                let _ = fatal.try_send(err);
            }
            Ok(())
        }
    }
}
