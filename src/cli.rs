use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use vault_client::{VaultClient, DEFAULT_AUTH_MOUNT, DEFAULT_JWT_PATH};

use crate::config::{FetchErrorPolicy, RenewalPolicy, RenewalTrigger, RunConfig, RunMode};
use crate::error::HarnessError;

/// Command line for the load generator
#[derive(Debug, Clone, Parser)]
#[command(name = "vault-stress")]
#[command(version, about = "Hammer Vault with dynamic database credential requests", long_about = None)]
pub struct Cli {
    /// vault url
    #[arg(long = "vault", short = 'v', env = "VAULT_ADDR")]
    pub vault: String,

    /// login to vault with the role provided
    #[arg(long, short = 'r', env = "VAULT_ROLE", default_value = "")]
    pub role: String,

    /// database role to obtain credentials for
    #[arg(long)]
    pub db: String,

    /// how many credentials to obtain per batch (0 = run unbounded)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub count: u64,

    /// maximum requests in flight
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub concurrency: usize,

    /// seconds to sleep between batches
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    pub sleep: u64,

    /// repeat batches forever
    #[arg(long, default_value_t = false)]
    pub forever: bool,

    /// kubernetes auth mount path
    #[arg(long, default_value = DEFAULT_AUTH_MOUNT)]
    pub auth_mount: String,

    /// database secrets engine mount path
    #[arg(long, default_value = "database")]
    pub database_mount: String,

    /// service account token used for login
    #[arg(long, env = "K8S_JWT_TOKEN_PATH", default_value = DEFAULT_JWT_PATH)]
    pub jwt_path: String,

    /// verify the Vault server certificate (skipped by default)
    #[arg(long, default_value_t = false)]
    pub tls_verify: bool,

    /// PEM bundle with additional trusted CA certificates
    #[arg(long, value_name = "PATH")]
    pub ca_cert: Option<PathBuf>,

    /// per-request timeout
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub request_timeout: u64,

    /// how remaining token lifetime is measured
    #[arg(long, value_enum, default_value_t = RenewalTrigger::Expiry)]
    pub renewal_trigger: RenewalTrigger,

    /// renew the token when less than this many seconds of lease remain
    #[arg(long, value_name = "SECONDS", default_value_t = 600)]
    pub safety_window: u64,

    /// what a failed credential read does
    #[arg(long, value_enum, default_value_t = FetchErrorPolicy::Log)]
    pub on_fetch_error: FetchErrorPolicy,

    /// unbounded mode: top up when fewer requests than this are outstanding
    #[arg(long, value_name = "N", default_value_t = 5000)]
    pub low_water_mark: u64,

    /// unbounded mode: requests added per top-up
    #[arg(long, value_name = "N", default_value_t = 5000)]
    pub top_up: u64,

    /// emit JSON logs
    #[arg(long, env = "JSON_LOG", default_value_t = false)]
    pub json_log: bool,

    /// debug logging as default instead of info; use RUST_LOG for more options
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_config(&self) -> Result<RunConfig, HarnessError> {
        let mode = RunMode::from_count(self.count, self.forever, Duration::from_secs(self.sleep));

        let mut config = RunConfig::new(&self.vault, &self.role, &self.db, mode);
        config.concurrency = self.concurrency;
        config.renewal = RenewalPolicy {
            trigger: self.renewal_trigger,
            safety_window: Duration::from_secs(self.safety_window),
        };
        config.fetch_error_policy = self.on_fetch_error;
        config.low_water_mark = self.low_water_mark;
        config.top_up = self.top_up;

        config.validate()?;
        Ok(config)
    }

    pub fn vault_client(&self) -> Result<VaultClient, HarnessError> {
        let mut builder = VaultClient::builder()
            .base_url(&self.vault)
            .role(&self.role)
            .auth_mount(&self.auth_mount)
            .jwt_path(&self.jwt_path)
            .database_mount(&self.database_mount)
            .tls_skip_verify(!self.tls_verify)
            .request_timeout(Duration::from_secs(self.request_timeout))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

        if let Some(ref ca_cert) = self.ca_cert {
            builder = builder.ca_cert(ca_cert);
        }

        builder.build().map_err(HarnessError::Client)
    }
}
