use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    /// No key was presented.
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The `[auth]` section cannot produce a working authenticator.
    #[error("Auth configuration error: {0}")]
    ConfigurationError(String),
}

/// Resolves the officer or administrator behind a request to a counter or
/// admin endpoint.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name reported in logs and the sanitized config.
    fn method_name(&self) -> &'static str;

    /// Whether every caller is let in without credentials and trusted with
    /// branch administration (queue reset, users, statistics).
    fn is_open(&self) -> bool {
        false
    }
}
