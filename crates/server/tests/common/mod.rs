//! Common test utilities for driving the HTTP API in-process.
//!
//! The fixture wires the real stores against a temporary database and a
//! manual clock, so tests can move time forward between queue actions.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use queue_buddy_core::config::ApiKeyEntry;
use queue_buddy_core::testing::ManualClock;
use queue_buddy_core::{
    create_audit_system, create_authenticator, AuditFilter, AuditStore, AuthMethod,
    CreateProfileRequest, QueueOptions, QueueService, Role, SqliteAuditStore, SqliteQueueStore,
    SqliteUserStore, UserStore,
};
use queue_buddy_server::api::{create_router, WsBroadcaster};
use queue_buddy_server::state::AppState;

use queue_buddy_core::testing::fixtures;

/// API key of a counter officer (`teller-1`).
pub const OFFICER_KEY: &str = "teller-key";
/// API key of a branch administrator (`head-office`).
pub const ADMIN_KEY: &str = "head-key";

/// In-process server over a temporary database.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_take_ticket() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post("/api/v1/tickets", json!({ "service_type": "teller" }))
///         .await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub queue: Arc<QueueService>,
    /// Drives every timestamp the queue records
    pub clock: Arc<ManualClock>,
    pub users: Arc<dyn UserStore>,
    pub audit_store: Arc<dyn AuditStore>,
    /// Holds the database; removed on drop
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with authentication disabled; every caller is an admin.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Fixture requiring API keys: [`OFFICER_KEY`] for an officer and
    /// [`ADMIN_KEY`] for an administrator.
    pub async fn with_api_keys() -> Self {
        Self::with_config(TestConfig { api_keys: true }).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = fixtures::test_config();
        config.database.path = db_path.clone();
        if test_config.api_keys {
            config.auth.method = AuthMethod::ApiKey;
            config.auth.api_keys = vec![
                ApiKeyEntry {
                    key: OFFICER_KEY.to_string(),
                    user_id: "teller-1".to_string(),
                },
                ApiKeyEntry {
                    key: ADMIN_KEY.to_string(),
                    user_id: "head-office".to_string(),
                },
            ];
        }

        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));

        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));

        let users: Arc<dyn UserStore> =
            Arc::new(SqliteUserStore::new(&db_path).expect("Failed to create user store"));
        if test_config.api_keys {
            users
                .create_profile(&CreateProfileRequest {
                    user_id: "head-office".to_string(),
                    email: "head@bankuca.co.id".to_string(),
                })
                .expect("Failed to create admin profile");
            users
                .grant_role("head-office", Role::Admin)
                .expect("Failed to grant admin role");
        }

        let clock = Arc::new(ManualClock::new(fixtures::opening_time()));
        let queue_store =
            Arc::new(SqliteQueueStore::new(&db_path).expect("Failed to create queue store"));
        let options = QueueOptions::from_config(&config).expect("Invalid queue options");
        let queue = Arc::new(
            QueueService::open(queue_store, clock.clone(), options)
                .expect("Failed to open queue"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&queue),
            Arc::clone(&users),
            audit_handle,
            Arc::clone(&audit_store),
            WsBroadcaster::default(),
        ));

        let router = create_router(state);

        Self {
            router,
            queue,
            clock,
            users,
            audit_store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, None).await
    }

    /// GET with an API key.
    pub async fn get_as(&self, key: &str, path: &str) -> TestResponse {
        self.request("GET", path, None, Some(key)).await
    }

    /// POST with an API key.
    pub async fn post_as(&self, key: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some(key)).await
    }

    /// PUT with an API key.
    pub async fn put_as(&self, key: &str, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), Some(key)).await
    }

    /// DELETE with an API key.
    pub async fn delete_as(&self, key: &str, path: &str) -> TestResponse {
        self.request("DELETE", path, None, Some(key)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Poll the audit store until `event_type` has been written `expected`
    /// times. The writer runs on its own task, so events land asynchronously.
    pub async fn wait_for_audit(&self, event_type: &str, expected: i64) -> i64 {
        let filter = AuditFilter::new().with_event_type(event_type);
        let mut count = 0;
        for _ in 0..100 {
            count = self.audit_store.count(&filter).expect("Failed to count audit events");
            if count >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        count
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        api_key: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require API keys instead of open access
    pub api_keys: bool,
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
