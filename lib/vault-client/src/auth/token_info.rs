use chrono::{DateTime, Utc};
use std::time::Duration;

/// Client token returned by a successful login
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: String,
    pub lease_duration: Duration,
    pub renewable: bool,
    pub issued_at: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(token: String, lease_duration: Duration, renewable: bool) -> Self {
        Self {
            token,
            lease_duration,
            renewable,
            issued_at: Utc::now(),
        }
    }
}
