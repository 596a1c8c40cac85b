//! Common test utilities for tally integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use tally_core::UserId;
use tally_service::{create_router, AppState, ServiceConfig};
use tally_store::{RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Shared state, for inspecting dead letters and the store.
    pub state: AppState,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// Settlement worker handles.
    pub workers: Vec<JoinHandle<()>>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a harness with a fresh database and running workers.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store: Arc<dyn Store> =
            Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            initial_balance: 20,
            seed_operations: true,
            random_org_url: None,
            random_string_batch: 10,
            random_string_length: 8,
            random_org_max_retries: 0,
            random_org_backoff_ms: 1,
            random_org_timeout_seconds: 5,
            settlement_guard: true,
            settlement_conflict_retries: 3,
        };
        adjust(&mut config);

        let state = AppState::new(store, config).expect("Failed to build app state");
        let workers = state.spawn_workers();
        let router: Router = create_router(state.clone());

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            test_user_id: UserId::generate(),
            workers,
            _temp_dir: temp_dir,
        }
    }

    /// Identity header value for the test user.
    pub fn user_header(&self) -> HeaderValue {
        user_header_for(&self.test_user_id)
    }

    /// Request an operation as the test user and return the response body.
    pub async fn request_operation(&self, body: Value) -> Value {
        let response = self
            .server
            .post("/v1/operations/requests")
            .add_header(user_id_header(), self.user_header())
            .json(&body)
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        response.json()
    }

    /// Poll a record until it is settled, or give up after about two seconds.
    pub async fn wait_for_record(&self, record_id: &str) -> Option<Value> {
        for _ in 0..100 {
            let response = self
                .server
                .get(&format!("/v1/records/{record_id}"))
                .add_header(user_id_header(), self.user_header())
                .await;
            if response.status_code() == StatusCode::OK {
                return Some(response.json());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Request an operation and wait for its record.
    pub async fn settle(&self, body: Value) -> Value {
        let admitted = self.request_operation(body).await;
        let record_id = admitted["record_id"].as_str().expect("record_id");
        self.wait_for_record(record_id)
            .await
            .expect("record was never settled")
    }

    /// Current balance of the test user.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/balance")
            .add_header(user_id_header(), self.user_header())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["balance"].as_i64().expect("balance")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The identity header name.
pub fn user_id_header() -> HeaderName {
    HeaderName::from_static("x-user-id")
}

/// Identity header value for `user_id`.
pub fn user_header_for(user_id: &UserId) -> HeaderValue {
    HeaderValue::from_str(&user_id.to_string()).expect("valid header value")
}

/// An addition request body.
pub fn addition(num1: f64, num2: f64) -> Value {
    json!({ "operation_type": "ADDITION", "num1": num1, "num2": num2 })
}
