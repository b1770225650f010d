//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use super::handlers::{
    create_folder, dashboard, delete_file, delete_folder, download_file, empty_trash, get_file,
    get_folder, list_folder_files, list_folders, list_trash, login, logout, me, refresh, register,
    rename_folder, restore_file, trash_file, upload_file, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, credentials_rate_limit, jwt_auth, security_headers,
    RateLimitState,
};

/// Multipart framing allowance on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the `/api` router with authentication, rate limiting and CORS.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let upload_limit = usize::try_from(app_state.files.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let jwt_state = app_state.jwt.clone();

    let credential_limit = rate_limit.clone();
    let credential_routes = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh))
        .layer(middleware::from_fn(move |req, next| {
            credentials_rate_limit(credential_limit.clone(), req, next)
        }));

    let auth_routes = Router::new()
        .merge(credential_routes)
        .route("/logout", post(logout))
        .route("/me", get(me));

    let folder_routes = Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route(
            "/:id",
            get(get_folder).put(rename_folder).delete(delete_folder),
        )
        .route(
            "/:id/files",
            get(list_folder_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        );

    let file_routes = Router::new()
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/download", get(download_file))
        .route("/:id/trash", post(trash_file))
        .route("/:id/restore", post(restore_file));

    let api_limit = rate_limit;
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/dashboard", get(dashboard))
        .nest("/folders", folder_routes)
        .nest("/files", file_routes)
        .route("/trash", get(list_trash).delete(empty_trash))
        .layer(middleware::from_fn(move |req, next| {
            api_rate_limit(api_limit.clone(), req, next)
        }));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Serve blobs from the local store directory under `public_url`.
pub fn create_blob_router(public_url: &str, blob_path: impl AsRef<Path>) -> Router {
    let prefix = format!("/{}", public_url.trim_matches('/'));
    Router::new().nest_service(&prefix, ServeDir::new(blob_path))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Full application: API, blobs, health and response compression.
pub fn create_app(
    app_state: Arc<AppState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
    public_url: &str,
    blob_path: impl AsRef<Path>,
) -> Router {
    create_router(app_state, rate_limit, cors_origins)
        .merge(create_blob_router(public_url, blob_path))
        .merge(create_health_router())
        .layer(CompressionLayer::new())
}
