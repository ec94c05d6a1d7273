//! API Key authentication.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that maps configured API keys to user ids.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
///
/// Only SHA-256 digests of the keys are held in memory.
pub struct ApiKeyAuthenticator {
    keys: Vec<([u8; 32], String)>,
}

impl ApiKeyAuthenticator {
    /// Build from `(key, user_id)` pairs.
    pub fn new(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(key, user_id)| (digest(&key), user_id))
                .collect(),
        }
    }

    /// Extract API key from request headers.
    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.headers.get("x-api-key").map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = digest(self.extract_key(request).ok_or(AuthError::NotAuthenticated)?);

        // Check every entry so the time taken does not reveal which key matched.
        let mut matched = None;
        for (expected, user_id) in &self.keys {
            if constant_time_eq(&provided, expected) && matched.is_none() {
                matched = Some(user_id);
            }
        }

        match matched {
            Some(user_id) => Ok(Identity {
                user_id: user_id.clone(),
                method: "api_key".to_string(),
            }),
            None => Err(AuthError::InvalidCredentials("Invalid API key".to_string())),
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
