use crate::auth::kubernetes::{DEFAULT_AUTH_MOUNT, DEFAULT_JWT_PATH};
use crate::auth::{AuthMethod, KubernetesAuth, TokenInfo};
use crate::error::VaultError;
use crate::models::{CredsResponse, DatabaseCredentials};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_DATABASE_MOUNT: &str = "database";
const DEFAULT_ROLE: &str = "app";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct VaultClientBuilder {
    base_url: Option<String>,
    role: Option<String>,
    auth_mount: Option<String>,
    jwt_path: Option<String>,
    database_mount: Option<String>,
    tls_skip_verify: bool,
    ca_cert: Option<PathBuf>,
    request_timeout: Duration,
    user_agent: Option<String>,
    auth_method: Option<Arc<dyn AuthMethod>>,
}

impl Default for VaultClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            role: None,
            auth_mount: None,
            jwt_path: None,
            database_mount: None,
            tls_skip_verify: true,
            ca_cert: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: None,
            auth_method: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn auth_mount(mut self, mount: impl Into<String>) -> Self {
        self.auth_mount = Some(mount.into());
        self
    }

    pub fn jwt_path(mut self, path: impl Into<String>) -> Self {
        self.jwt_path = Some(path.into());
        self
    }

    pub fn database_mount(mut self, mount: impl Into<String>) -> Self {
        self.database_mount = Some(mount.into());
        self
    }

    /// Skip server certificate verification (defaults to true)
    pub fn tls_skip_verify(mut self, skip: bool) -> Self {
        self.tls_skip_verify = skip;
        self
    }

    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Replace the default Kubernetes login
    pub fn auth_method(mut self, method: Arc<dyn AuthMethod>) -> Self {
        self.auth_method = Some(method);
        self
    }

    fn resolve_config(&self) -> Result<ResolvedConfig, VaultError> {
        let base_url = self
            .base_url
            .clone()
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .ok_or(VaultError::VaultNotDetected)?
            .trim_end_matches('/')
            .to_string();

        let role = self
            .role
            .clone()
            .or_else(|| std::env::var("VAULT_ROLE").ok())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let auth_mount = self
            .auth_mount
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTH_MOUNT.to_string());

        let jwt_path = self
            .jwt_path
            .clone()
            .or_else(|| std::env::var("K8S_JWT_TOKEN_PATH").ok())
            .unwrap_or_else(|| DEFAULT_JWT_PATH.to_string());

        let database_mount = self
            .database_mount
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE_MOUNT.to_string());

        Ok(ResolvedConfig {
            base_url,
            role,
            auth_mount,
            jwt_path,
            database_mount,
        })
    }

    fn build_http(&self) -> Result<reqwest::Client, VaultError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(self.tls_skip_verify);

        if let Some(ref path) = self.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                VaultError::Tls(format!("Failed to read CA bundle {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| VaultError::Tls(format!("Invalid CA bundle {}: {}", path.display(), e)))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(ref agent) = self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build().map_err(|e| VaultError::Tls(e.to_string()))
    }

    pub fn build(self) -> Result<VaultClient, VaultError> {
        let config = self.resolve_config()?;
        let http = self.build_http()?;

        let auth_method = self.auth_method.unwrap_or_else(|| {
            Arc::new(
                KubernetesAuth::new(config.auth_mount, config.role).with_jwt_path(config.jwt_path),
            )
        });

        Ok(VaultClient {
            base_url: config.base_url,
            http,
            auth_method,
            database_mount: config.database_mount,
        })
    }
}

struct ResolvedConfig {
    base_url: String,
    role: String,
    auth_mount: String,
    jwt_path: String,
    database_mount: String,
}

/// Vault client sharing one connection pool across all requests
#[derive(Clone)]
pub struct VaultClient {
    base_url: String,
    http: reqwest::Client,
    auth_method: Arc<dyn AuthMethod>,
    database_mount: String,
}

impl VaultClient {
    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    /// Log in with the configured auth method
    pub async fn login(&self) -> Result<TokenInfo, VaultError> {
        self.auth_method.authenticate(&self.http, &self.base_url).await
    }

    /// Request a fresh set of dynamic credentials for `role`
    pub async fn read_database_credentials(
        &self,
        token: &str,
        role: &str,
    ) -> Result<DatabaseCredentials, VaultError> {
        let url = format!("{}/v1/{}/creds/{}", self.base_url, self.database_mount, role);

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", token)
            .send()
            .await
            .map_err(|e| VaultError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VaultError::from_response(response).await);
        }

        let resp: CredsResponse = response
            .json()
            .await
            .map_err(|e| VaultError::Decode(format!("credentials response: {}", e)))?;

        Ok(resp.into())
    }
}
