//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest};
use crate::db::{NewRefreshToken, RefreshTokenRepository, User, UserRepository};
use crate::web::dto::{
    ApiResponse, LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse,
    RegisterRequest, UserInfo, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

fn new_refresh_token(state: &AppState, user_id: i64) -> NewRefreshToken {
    NewRefreshToken::expiring_in(
        user_id,
        uuid::Uuid::new_v4().to_string(),
        chrono::Duration::days(state.refresh_token_expiry_days as i64),
    )
}

/// Prepare the user's reserved folders and open a session.
async fn start_session(state: &AppState, user: &User) -> Result<LoginResponse, ApiError> {
    state.files.ensure_reserved_folders(user.id).await?;

    let access_token = state.jwt.issue(user)?;
    let refresh = new_refresh_token(state, user.id);
    RefreshTokenRepository::new(state.db.pool())
        .create(&refresh)
        .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token: refresh.token,
        expires_in: state.jwt.access_token_expiry_secs(),
        user: UserInfo::from(user),
    })
}

/// POST /api/auth/register - Create an account and sign in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = auth::register(&repo, RegistrationRequest::new(req.username, req.password))
        .await
        .map_err(crate::FilecabError::from)?;

    let session = start_session(&state, &user).await?;
    let message = format!("Welcome, {}!", user.username);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session, message))))
}

/// POST /api/auth/login - Sign in.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = auth::authenticate(&repo, &req.username, &req.password)
        .await
        .map_err(crate::FilecabError::from)?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    let session = start_session(&state, &user).await?;
    Ok(Json(ApiResponse::success(session, "Signed in")))
}

/// POST /api/auth/logout - Revoke the session's refresh token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let revoked = RefreshTokenRepository::new(state.db.pool())
        .revoke(&req.refresh_token, auth_user.user_id())
        .await?;

    if !revoked {
        tracing::debug!(user_id = auth_user.user_id(), "Logout with unknown refresh token");
    }
    Ok(Json(ApiResponse::success((), "Signed out")))
}

/// POST /api/auth/refresh - Exchange a refresh token for a new pair.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let tokens = RefreshTokenRepository::new(state.db.pool());
    let current = tokens
        .get_valid_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepository::new(state.db.pool())
        .get_by_id(current.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    let replacement = new_refresh_token(&state, user.id);
    tokens.rotate(&current.token, &replacement).await?;

    Ok(Json(ApiResponse::new(RefreshResponse {
        access_token: state.jwt.issue(&user)?,
        refresh_token: replacement.token,
        expires_in: state.jwt.access_token_expiry_secs(),
    })))
}

/// GET /api/auth/me - Current user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(auth_user.user_id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(Json(ApiResponse::new(UserInfo::from(&user))))
}
