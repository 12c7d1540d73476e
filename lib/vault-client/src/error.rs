use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault not detected: VAULT_ADDR not set")]
    VaultNotDetected,

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Failed to read identity token from {path}: {source}")]
    IdentityToken {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Identity token at {path} is not valid UTF-8")]
    IdentityTokenEncoding { path: String },

    #[error("Vault returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Vault request error: {0}")]
    Request(String),

    #[error("Invalid Vault response: {0}")]
    Decode(String),
}

impl VaultError {
    /// Build a status error from a failed response, preferring Vault's `errors` array.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        VaultError::Status {
            status,
            message: error_message(&body),
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join("; "),
        _ => body.trim().to_string(),
    }
}
