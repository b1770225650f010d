//! Dashboard and folder handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::UserRepository;
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DashboardResponse, DeletedFolderResponse, FileResponse,
    FolderContentsResponse, FolderResponse, NoticeLevel, RenameFolderRequest, UserInfo,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// GET /api/dashboard - User, reserved folder IDs and all folders.
///
/// Recreates missing reserved folders on every visit.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let user_id = auth_user.user_id();
    let user = UserRepository::new(state.db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    let reserved = state.files.ensure_reserved_folders(user_id).await?;
    let folders = state.files.list_folders(user_id).await?;

    Ok(Json(ApiResponse::new(DashboardResponse {
        user: UserInfo::from(&user),
        all_files_id: reserved.all_files.id,
        trash_id: reserved.trash.id,
        folders: folders.iter().map(FolderResponse::from).collect(),
    })))
}

/// GET /api/folders - List the caller's folders.
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let folders = state.files.list_folders(auth_user.user_id()).await?;
    Ok(Json(ApiResponse::new(
        folders.iter().map(FolderResponse::from).collect(),
    )))
}

/// POST /api/folders - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let folder = state
        .files
        .create_folder(auth_user.user_id(), &req.name)
        .await?;

    let message = format!("Folder \"{}\" created", folder.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FolderResponse::from(&folder), message)),
    ))
}

/// GET /api/folders/:id - A folder and the files it shows.
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<FolderContentsResponse>>, ApiError> {
    let user_id = auth_user.user_id();
    let folder = state.files.get_folder(user_id, folder_id).await?;
    let files = state.files.list_folder_files(user_id, folder_id).await?;

    Ok(Json(ApiResponse::new(FolderContentsResponse {
        folder: FolderResponse {
            file_count: Some(files.len() as i64),
            ..FolderResponse::from(&folder)
        },
        files: files.iter().map(FileResponse::from).collect(),
    })))
}

/// GET /api/folders/:id/files - The files a folder shows.
pub async fn list_folder_files(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state
        .files
        .list_folder_files(auth_user.user_id(), folder_id)
        .await?;
    Ok(Json(ApiResponse::new(
        files.iter().map(FileResponse::from).collect(),
    )))
}

/// PUT /api/folders/:id - Rename a folder.
///
/// Reserved folders are refused whatever the requested name.
pub async fn rename_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(folder_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state
        .files
        .rename_folder(auth_user.user_id(), folder_id, &req.name)
        .await?;

    let message = format!("Folder renamed to \"{}\"", folder.name);
    Ok(Json(ApiResponse::success(FolderResponse::from(&folder), message)))
}

/// DELETE /api/folders/:id - Delete a folder, moving its files to Trash.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedFolderResponse>>, ApiError> {
    let moved = state
        .files
        .delete_folder(auth_user.user_id(), folder_id)
        .await?;

    let data = DeletedFolderResponse {
        id: folder_id,
        moved_to_trash: moved,
    };
    let response = if moved == 0 {
        ApiResponse::success(data, "Folder deleted")
    } else {
        ApiResponse::new(data).with_notice(
            NoticeLevel::Info,
            format!("Folder deleted, {moved} file(s) moved to Trash"),
        )
    };
    Ok(Json(response))
}
