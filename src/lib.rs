//! Load generator for Vault dynamic database credentials.
//!
//! Logs in with a Kubernetes service account, then requests database
//! credentials in fixed batches or from a self-refilling backlog, with a
//! cap on requests in flight and token renewal before expiry.

mod backend;
mod backlog;
mod cli;
mod config;
mod context;
mod driver;
mod error;
mod fetch;
mod limiter;
mod session;
mod stats;

pub use backend::SecretsBackend;
pub use backlog::BacklogCounter;
pub use cli::Cli;
pub use config::{
    FetchErrorPolicy, RenewalPolicy, RenewalTrigger, RunConfig, RunMode, DEFAULT_LOW_WATER_MARK,
    DEFAULT_POLL_INTERVAL, DEFAULT_SAFETY_WINDOW, DEFAULT_TOP_UP,
};
pub use context::RunContext;
pub use driver::{BatchSummary, Driver, DriverState};
pub use error::HarnessError;
pub use fetch::{fetch_credentials, run_fetch, Completion};
pub use limiter::{Limiter, LimiterPermit, LimiterSnapshot};
pub use session::{Session, SessionManager};
pub use stats::{RunStats, StatsSnapshot};
