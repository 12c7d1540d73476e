use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::HarnessError;

/// Top up the unbounded backlog when it drops below this many requests
pub const DEFAULT_LOW_WATER_MARK: u64 = 5000;
/// Requests added per top-up
pub const DEFAULT_TOP_UP: u64 = 5000;
/// Renew the Vault token when less than this much lease is left
pub const DEFAULT_SAFETY_WINDOW: Duration = Duration::from_secs(600);
/// Control loop period in unbounded mode
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Issue `count` requests, wait for all of them, optionally loop forever
    Batch {
        count: u64,
        repeat: bool,
        sleep: Duration,
    },
    /// Keep a self-refilling backlog of requests in flight
    Unbounded,
}

impl RunMode {
    /// A count of zero selects unbounded mode; `repeat` and `sleep` only apply to batches.
    pub fn from_count(count: u64, repeat: bool, sleep: Duration) -> Self {
        if count == 0 {
            RunMode::Unbounded
        } else {
            RunMode::Batch {
                count,
                repeat,
                sleep,
            }
        }
    }
}

/// How remaining token lifetime is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RenewalTrigger {
    /// Absolute expiry (issued_at + lease) compared with wall clock
    #[default]
    Expiry,
    /// Lease seconds counted down in whole elapsed seconds
    RemainingLease,
}

/// What a failed credential read does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FetchErrorPolicy {
    /// Log and count the failure, keep going
    #[default]
    Log,
    /// Terminate the run on the first failure
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    pub trigger: RenewalTrigger,
    pub safety_window: Duration,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            trigger: RenewalTrigger::default(),
            safety_window: DEFAULT_SAFETY_WINDOW,
        }
    }
}

/// Resolved once at startup, read-only afterwards
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub vault_addr: String,
    pub auth_role: String,
    pub db_role: String,
    pub mode: RunMode,
    pub concurrency: usize,
    pub renewal: RenewalPolicy,
    pub fetch_error_policy: FetchErrorPolicy,
    pub low_water_mark: u64,
    pub top_up: u64,
    pub poll_interval: Duration,
}

impl RunConfig {
    pub fn new(
        vault_addr: impl Into<String>,
        auth_role: impl Into<String>,
        db_role: impl Into<String>,
        mode: RunMode,
    ) -> Self {
        Self {
            vault_addr: vault_addr.into(),
            auth_role: auth_role.into(),
            db_role: db_role.into(),
            mode,
            concurrency: DEFAULT_CONCURRENCY,
            renewal: RenewalPolicy::default(),
            fetch_error_policy: FetchErrorPolicy::default(),
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            top_up: DEFAULT_TOP_UP,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.vault_addr.trim().is_empty() {
            return Err(HarnessError::Config("vault address is required".into()));
        }
        if self.db_role.trim().is_empty() {
            return Err(HarnessError::Config("database role is required".into()));
        }
        if self.concurrency == 0 {
            return Err(HarnessError::Config("concurrency must be at least 1".into()));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(HarnessError::Config(format!(
                "concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.mode == RunMode::Unbounded {
            if self.top_up == 0 {
                return Err(HarnessError::Config("top-up amount must be at least 1".into()));
            }
            if self.poll_interval.is_zero() {
                return Err(HarnessError::Config("poll interval must be non-zero".into()));
            }
        }
        Ok(())
    }
}
