//! Authentication, authorization and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use queue_buddy_core::{AuthError, AuthRequest, Identity};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

use super::handlers::api_error;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// On success the caller's [`Identity`] is stored in the request extensions.
/// Missing or wrong credentials yield 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    if authenticator.is_open() {
        request.extensions_mut().insert(Identity::anonymous());
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    // Default to localhost when the connection info is not available
    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::NotAuthenticated) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["not_authenticated"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::InvalidCredentials(_)) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            error!("Authentication error: {}", e);
            AUTH_FAILURES_TOTAL
                .with_label_values(&["internal_error"])
                .inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Role middleware for admin-only routes.
///
/// Must run after [`auth_middleware`]. Callers without the admin role get
/// 403 Forbidden.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_else(Identity::anonymous);

    match state.is_admin(&identity) {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            warn!(
                user_id = %identity.user_id,
                path = %request.uri().path(),
                "Admin access denied"
            );
            AUTH_FAILURES_TOTAL.with_label_values(&["forbidden"]).inc();
            api_error(StatusCode::FORBIDDEN, "Admin role required").into_response()
        }
        Err(e) => {
            error!("Failed to look up roles: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Extractor for authenticated user ID.
///
/// Extracts the user_id from the Identity stored in request extensions.
/// Falls back to "anonymous" on routes without the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.user_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthUser(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        middleware,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use queue_buddy_core::config::{ApiKeyEntry, AuthConfig};
    use queue_buddy_core::testing::fixtures;
    use queue_buddy_core::{
        create_audit_system, create_authenticator, AuditStore, AuthMethod, CreateProfileRequest,
        Role, SqliteAuditStore, SqliteUserStore, UserStore,
    };
    use tower::ServiceExt;

    use crate::api::WsBroadcaster;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    async fn user_handler(AuthUser(user_id): AuthUser) -> String {
        user_id
    }

    fn api_key_auth() -> AuthConfig {
        AuthConfig {
            method: AuthMethod::ApiKey,
            api_keys: vec![
                ApiKeyEntry {
                    key: "teller-key".to_string(),
                    user_id: "teller-1".to_string(),
                },
                ApiKeyEntry {
                    key: "head-key".to_string(),
                    user_id: "head-office".to_string(),
                },
            ],
            bootstrap_admins: vec![],
        }
    }

    fn none_auth() -> AuthConfig {
        AuthConfig {
            method: AuthMethod::None,
            api_keys: vec![],
            bootstrap_admins: vec![],
        }
    }

    fn create_test_state(auth: AuthConfig) -> Arc<AppState> {
        let mut config = fixtures::test_config();
        config.auth = auth;

        let authenticator = Arc::from(create_authenticator(&config.auth).unwrap());
        let users = Arc::new(SqliteUserStore::in_memory().unwrap());
        users
            .create_profile(&CreateProfileRequest {
                user_id: "head-office".to_string(),
                email: "head@bankuca.co.id".to_string(),
            })
            .unwrap();
        users.grant_role("head-office", Role::Admin).unwrap();

        let audit_store =
            Arc::new(SqliteAuditStore::in_memory().unwrap()) as Arc<dyn AuditStore>;
        let (audit_handle, _writer) = create_audit_system(audit_store.clone(), 100);
        let (queue, _store, _clock) = fixtures::queue_service();

        Arc::new(AppState::new(
            config,
            authenticator,
            queue,
            users as Arc<dyn UserStore>,
            audit_handle,
            audit_store,
            WsBroadcaster::default(),
        ))
    }

    fn protected_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(dummy_handler))
            .route("/whoami", get(user_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn admin_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/admin", get(dummy_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn body_string(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_none_auth_allows_all() {
        let app = protected_app(create_test_state(none_auth()));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_key_auth_valid() {
        let app = protected_app(create_test_state(api_key_auth()));

        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer teller-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_key_auth_invalid() {
        let app = protected_app(create_test_state(api_key_auth()));

        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer wrong-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_key_auth_missing() {
        let app = protected_app(create_test_state(api_key_auth()));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_user_extractor_with_api_key() {
        let app = protected_app(create_test_state(api_key_auth()));

        let request = Request::builder()
            .uri("/whoami")
            .header("X-API-Key", "teller-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "teller-1");
    }

    #[tokio::test]
    async fn test_auth_user_extractor_with_none_auth() {
        let app = protected_app(create_test_state(none_auth()));

        let request = Request::builder().uri("/whoami").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_require_admin_rejects_officer() {
        let app = admin_app(create_test_state(api_key_auth()));

        let request = Request::builder()
            .uri("/admin")
            .header(header::AUTHORIZATION, "Bearer teller-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.contains("Admin role required"));
    }

    #[tokio::test]
    async fn test_require_admin_accepts_admin() {
        let app = admin_app(create_test_state(api_key_auth()));

        let request = Request::builder()
            .uri("/admin")
            .header(header::AUTHORIZATION, "Bearer head-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_admin_runs_after_authentication() {
        let app = admin_app(create_test_state(api_key_auth()));

        let request = Request::builder().uri("/admin").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_is_admin_follows_authenticator() {
        let officer = Identity {
            user_id: "teller-1".to_string(),
            method: "api_key".to_string(),
        };
        let head = Identity {
            user_id: "head-office".to_string(),
            method: "api_key".to_string(),
        };

        let keyed = create_test_state(api_key_auth());
        assert!(!keyed.is_admin(&officer).unwrap());
        assert!(keyed.is_admin(&head).unwrap());
        assert!(!keyed.is_admin(&Identity::anonymous()).unwrap());

        let open = create_test_state(none_auth());
        assert!(open.is_admin(&officer).unwrap());
        assert!(open.is_admin(&Identity::anonymous()).unwrap());
    }

    #[tokio::test]
    async fn test_require_admin_open_without_auth() {
        let app = admin_app(create_test_state(none_auth()));

        let request = Request::builder().uri("/admin").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
