use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dynamically-issued database credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub lease_id: String,
    pub lease_duration: Duration,
    pub renewable: bool,
    pub username: String,
    pub password: String,
}

/// Envelope for `GET /v1/<mount>/creds/<role>`
#[derive(Debug, Deserialize)]
pub(crate) struct CredsResponse {
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    pub data: CredsData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CredsData {
    pub username: String,
    pub password: String,
}

impl From<CredsResponse> for DatabaseCredentials {
    fn from(resp: CredsResponse) -> Self {
        Self {
            lease_id: resp.lease_id,
            lease_duration: Duration::from_secs(resp.lease_duration),
            renewable: resp.renewable,
            username: resp.data.username,
            password: resp.data.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creds_response_deserialize() {
        let json = r#"{
            "request_id": "8a1b",
            "lease_id": "database/creds/readonly/2f6a614c",
            "renewable": true,
            "lease_duration": 3600,
            "data": {"username": "v-k8s-readonly-x1", "password": "A1a-secret"},
            "warnings": null
        }"#;
        let resp: CredsResponse = serde_json::from_str(json).unwrap();
        let creds = DatabaseCredentials::from(resp);
        assert_eq!(creds.lease_id, "database/creds/readonly/2f6a614c");
        assert_eq!(creds.lease_duration, Duration::from_secs(3600));
        assert!(creds.renewable);
        assert_eq!(creds.username, "v-k8s-readonly-x1");
    }

    #[test]
    fn test_creds_response_missing_lease_fields() {
        let json = r#"{"data": {"username": "u", "password": "p"}}"#;
        let creds = DatabaseCredentials::from(serde_json::from_str::<CredsResponse>(json).unwrap());
        assert!(creds.lease_id.is_empty());
        assert!(creds.lease_duration.is_zero());
        assert!(!creds.renewable);
    }
}
