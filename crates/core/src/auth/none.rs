use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Open access for a branch on a closed network: every caller is the
/// anonymous identity and may act as an administrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }

    fn is_open(&self) -> bool {
        true
    }
}
