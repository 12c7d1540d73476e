//! vault-client - minimal async client for HashiCorp Vault
//!
//! Covers what a credential load test needs:
//! 1. Kubernetes service account login → client token + lease
//! 2. Reads of dynamically-issued database credentials

pub mod auth;
mod client;
mod error;
mod models;

pub use auth::kubernetes::{DEFAULT_AUTH_MOUNT, DEFAULT_JWT_PATH};
pub use auth::{AuthMethod, KubernetesAuth, TokenInfo};
pub use client::{VaultClient, VaultClientBuilder};
pub use error::VaultError;
pub use models::DatabaseCredentials;
