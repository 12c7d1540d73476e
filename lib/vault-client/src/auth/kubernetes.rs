use super::{AuthMethod, TokenInfo};
use crate::VaultError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_AUTH_MOUNT: &str = "kubernetes";

/// Kubernetes service account authentication
#[derive(Debug, Clone)]
pub struct KubernetesAuth {
    pub auth_mount: String,
    pub role: String,
    pub jwt_path: String,
}

impl KubernetesAuth {
    pub fn new(auth_mount: String, role: String) -> Self {
        Self {
            auth_mount,
            role,
            jwt_path: DEFAULT_JWT_PATH.to_string(),
        }
    }

    pub fn with_jwt_path(mut self, path: String) -> Self {
        self.jwt_path = path;
        self
    }

    /// Read the projected service account token. Re-read on every login
    /// because kubelet rotates the file.
    async fn read_jwt(&self) -> Result<String, VaultError> {
        let raw = tokio::fs::read(&self.jwt_path)
            .await
            .map_err(|source| VaultError::IdentityToken {
                path: self.jwt_path.clone(),
                source,
            })?;

        String::from_utf8(raw)
            .map(|s| s.trim().to_string())
            .map_err(|_| VaultError::IdentityTokenEncoding {
                path: self.jwt_path.clone(),
            })
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    jwt: String,
    role: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<AuthData>,
}

#[derive(Deserialize)]
struct AuthData {
    client_token: String,
    lease_duration: u64,
    #[serde(default)]
    renewable: bool,
}

#[async_trait]
impl AuthMethod for KubernetesAuth {
    async fn authenticate(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<TokenInfo, VaultError> {
        let jwt = self.read_jwt().await?;
        let url = format!("{}/v1/auth/{}/login", base_url, self.auth_mount);

        let response = http
            .post(&url)
            .json(&LoginRequest {
                jwt,
                role: &self.role,
            })
            .send()
            .await
            .map_err(|e| VaultError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VaultError::from_response(response).await);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| VaultError::Decode(format!("login response: {}", e)))?;

        let auth = login
            .auth
            .ok_or_else(|| VaultError::Decode("login response has no auth block".to_string()))?;

        tracing::debug!(
            mount = %self.auth_mount,
            role = %self.role,
            lease_secs = auth.lease_duration,
            "Kubernetes login succeeded"
        );

        Ok(TokenInfo::new(
            auth.client_token,
            Duration::from_secs(auth.lease_duration),
            auth.renewable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_jwt_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "my-jwt-token").unwrap();

        let auth = KubernetesAuth::new("kubernetes".to_string(), "app".to_string())
            .with_jwt_path(file.path().to_str().unwrap().to_string());

        let jwt = auth.read_jwt().await.unwrap();
        assert_eq!(jwt, "my-jwt-token");
    }

    #[tokio::test]
    async fn test_read_jwt_missing_file() {
        let auth = KubernetesAuth::new("kubernetes".to_string(), "app".to_string())
            .with_jwt_path("/nonexistent/path".to_string());

        let result = auth.read_jwt().await;
        assert!(matches!(result, Err(VaultError::IdentityToken { .. })));
    }

    #[tokio::test]
    async fn test_read_jwt_rejects_non_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let auth = KubernetesAuth::new("kubernetes".to_string(), "app".to_string())
            .with_jwt_path(file.path().to_str().unwrap().to_string());

        let result = auth.read_jwt().await;
        assert!(matches!(result, Err(VaultError::IdentityTokenEncoding { .. })));
    }
}
