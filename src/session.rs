use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeDelta, Utc};
use vault_client::TokenInfo;

use crate::backend::SecretsBackend;
use crate::config::{RenewalPolicy, RenewalTrigger};
use crate::error::HarnessError;

/// An authenticated Vault token and its validity window
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    issued_at: DateTime<Utc>,
    lease_duration: Duration,
}

impl Session {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>, lease_duration: Duration) -> Self {
        Self {
            token: token.into(),
            issued_at,
            lease_duration,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.lease_duration)
            .ok()
            .and_then(|lease| self.issued_at.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Lifetime left at `now`; negative once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expires_at().signed_duration_since(now)
    }

    /// True when less than `window` of the lease is left. A zero lease has
    /// nothing left, so it renews on every check.
    pub fn needs_renewal(
        &self,
        now: DateTime<Utc>,
        window: Duration,
        trigger: RenewalTrigger,
    ) -> bool {
        match trigger {
            RenewalTrigger::Expiry => {
                let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
                self.remaining(now) < window
            }
            RenewalTrigger::RemainingLease => {
                let elapsed = now.signed_duration_since(self.issued_at).num_seconds().max(0);
                let lease = i64::try_from(self.lease_duration.as_secs()).unwrap_or(i64::MAX);
                let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
                lease.saturating_sub(elapsed) < window
            }
        }
    }
}

impl From<TokenInfo> for Session {
    fn from(info: TokenInfo) -> Self {
        Self::new(info.token, info.issued_at, info.lease_duration)
    }
}

/// Owns the current session. Many readers, one writer; readers never block.
pub struct SessionManager<B> {
    backend: Arc<B>,
    current: ArcSwap<Session>,
    policy: RenewalPolicy,
    authentications: AtomicU64,
}

impl<B: SecretsBackend> SessionManager<B> {
    /// Log in once so a valid session exists before any request is made
    pub async fn establish(backend: Arc<B>, policy: RenewalPolicy) -> Result<Self, HarnessError> {
        let session = login(backend.as_ref()).await?;
        log_session("Vault login succeeded", &session);

        Ok(Self {
            backend,
            current: ArcSwap::from_pointee(session),
            policy,
            authentications: AtomicU64::new(1),
        })
    }

    /// Log in again and publish the new session
    pub async fn authenticate(&self) -> Result<Arc<Session>, HarnessError> {
        let session = Arc::new(login(self.backend.as_ref()).await?);
        self.current.store(Arc::clone(&session));
        self.authentications.fetch_add(1, Ordering::Relaxed);
        log_session("Vault token renewed", &session);
        Ok(session)
    }

    pub fn current(&self) -> Arc<Session> {
        self.current.load_full()
    }

    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        self.current()
            .needs_renewal(now, self.policy.safety_window, self.policy.trigger)
    }

    /// Number of successful logins, the initial one included
    pub fn authentications(&self) -> u64 {
        self.authentications.load(Ordering::Relaxed)
    }
}

async fn login<B: SecretsBackend + ?Sized>(backend: &B) -> Result<Session, HarnessError> {
    backend
        .login()
        .await
        .map(Session::from)
        .map_err(HarnessError::Auth)
}

fn log_session(message: &str, session: &Session) {
    tracing::info!(
        lease_secs = session.lease_duration().as_secs(),
        expires_at = %session.expires_at(),
        "{}",
        message
    );
}
