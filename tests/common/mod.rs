//! Shared helpers for the Web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use filecab::config::WebConfig;
use filecab::file::{FileService, LocalBlobStore, StagingArea};
use filecab::web::handlers::AppState;
use filecab::web::middleware::{JwtState, RateLimitState};
use filecab::web::router::create_app;
use filecab::Database;

/// Upload limit used by the test application.
pub const MAX_UPLOAD_BYTES: u64 = 1024 * 1024;

/// A running test application and the directories backing it.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub temp: TempDir,
}

/// Create a test configuration.
fn create_test_config() -> WebConfig {
    WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        jwt_access_token_expiry_secs: 900,
        jwt_refresh_token_expiry_days: 7,
        login_rate_limit: 1000,
        api_rate_limit: 10000,
    }
}

/// Create a test application with an in-memory database and temp storage.
pub async fn create_test_app() -> TestApp {
    let config = create_test_config();
    let temp = TempDir::new().expect("Failed to create temp dir");
    let blob_path = temp.path().join("blobs");

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let store = LocalBlobStore::new(&blob_path, "/blobs").expect("Failed to create blob store");
    let staging =
        StagingArea::new(temp.path().join("uploads")).expect("Failed to create staging area");
    let files = Arc::new(FileService::new(
        db.clone(),
        Arc::new(store),
        staging,
        MAX_UPLOAD_BYTES,
    ));

    let app_state = Arc::new(AppState::new(
        db.clone(),
        files,
        Arc::new(JwtState::new(
            &config.jwt_secret,
            config.jwt_access_token_expiry_secs,
        )),
        config.jwt_refresh_token_expiry_days,
    ));
    let rate_limit = Arc::new(RateLimitState::new(
        config.login_rate_limit,
        config.api_rate_limit,
    ));

    let app = create_app(
        app_state,
        rate_limit,
        &config.cors_origins,
        "/blobs",
        &blob_path,
    );
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp { server, db, temp }
}

/// Register a user and return the response body.
pub async fn register_user(server: &TestServer, username: &str, password: &str) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Log in and return the response.
pub async fn login(server: &TestServer, username: &str, password: &str) -> TestResponse {
    server
        .post("/api/auth/login")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await
}

/// Register a user and return its access token.
pub async fn access_token_for(server: &TestServer, username: &str) -> String {
    let body = register_user(server, username, "password123").await;
    body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Bearer authorization header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Fetch the dashboard and return its `data` object.
pub async fn dashboard(server: &TestServer, token: &str) -> Value {
    let response = server
        .get("/api/dashboard")
        .add_header(AUTHORIZATION, bearer(token))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"].clone()
}

/// Create a folder and return its ID.
pub async fn create_folder(server: &TestServer, token: &str, name: &str) -> i64 {
    let response = server
        .post("/api/folders")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "name": name }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["id"]
        .as_i64()
        .expect("folder id")
}

/// Upload `bytes` as `name` into a folder.
pub async fn upload(
    server: &TestServer,
    token: &str,
    folder_id: i64,
    name: &str,
    bytes: Vec<u8>,
) -> TestResponse {
    let form = MultipartForm::new().add_part("file", Part::bytes(bytes).file_name(name));
    server
        .post(&format!("/api/folders/{folder_id}/files"))
        .add_header(AUTHORIZATION, bearer(token))
        .multipart(form)
        .await
}

/// IDs of the files listed in a JSON array.
pub fn file_ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .map(|files| files.iter().filter_map(|f| f["id"].as_i64()).collect())
        .unwrap_or_default()
}
