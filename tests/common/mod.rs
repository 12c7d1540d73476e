#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vault_client::{DatabaseCredentials, TokenInfo, VaultError};
use vault_stress::SecretsBackend;

/// Instrumented in-memory stand-in for Vault
pub struct MockBackend {
    lease: Duration,
    read_delay: Duration,
    stagger: bool,
    fail_every: Option<u64>,
    fail_login_after: Option<u64>,
    logins: AtomicU64,
    reads: AtomicU64,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    read_times: Mutex<Vec<Instant>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(3600),
            read_delay: Duration::ZERO,
            stagger: false,
            fail_every: None,
            fail_login_after: None,
            logins: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            read_times: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Vary the delay per request so completions arrive out of order
    pub fn stagger(mut self) -> Self {
        self.stagger = true;
        self
    }

    /// Fail every n-th read
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n);
        self
    }

    /// Allow `n` logins, reject the rest
    pub fn fail_login_after(mut self, n: u64) -> Self {
        self.fail_login_after = Some(n);
        self
    }

    pub fn logins(&self) -> u64 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn read_times(&self) -> Vec<Instant> {
        self.read_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretsBackend for MockBackend {
    async fn login(&self) -> Result<TokenInfo, VaultError> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_login_after.is_some_and(|limit| n > limit) {
            return Err(VaultError::Status {
                status: 403,
                message: "permission denied".to_string(),
            });
        }
        Ok(TokenInfo::new(format!("s.token-{n}"), self.lease, true))
    }

    async fn read_database_credentials(
        &self,
        token: &str,
        role: &str,
    ) -> Result<DatabaseCredentials, VaultError> {
        assert!(token.starts_with("s.token-"), "unexpected token {token}");

        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        let holders = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(holders, Ordering::SeqCst);
        self.read_times.lock().unwrap().push(Instant::now());

        let delay = if self.stagger {
            self.read_delay * ((n % 5) as u32 + 1)
        } else {
            self.read_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_every.is_some_and(|every| n % every == 0) {
            return Err(VaultError::Status {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        Ok(DatabaseCredentials {
            lease_id: format!("database/creds/{role}/{n}"),
            lease_duration: Duration::from_secs(3600),
            renewable: true,
            username: format!("v-{role}-{n}"),
            password: "secret".to_string(),
        })
    }
}
