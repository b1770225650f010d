//! File and trash handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use std::sync::Arc;

use crate::web::dto::{ApiResponse, EmptyTrashResponse, FileResponse, NoticeLevel};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// POST /api/folders/:id/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(folder_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let mut staged = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("File field has no file name"))?;
        let content = field.bytes().await?;

        staged = Some(state.files.staging().stage(&filename, &content).await?);
        break;
    }

    let staged = staged.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let file = state
        .files
        .upload(auth_user.user_id(), folder_id, staged)
        .await?;

    let message = format!("Uploaded \"{}\"", file.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FileResponse::from(&file), message)),
    ))
}

/// GET /api/files/:id - File metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.files.get_file(auth_user.user_id(), file_id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(&file))))
}

/// GET /api/files/:id/download - Redirect to the blob URL.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let url = state
        .files
        .download_url(auth_user.user_id(), file_id)
        .await?;
    Ok(Redirect::temporary(&url))
}

/// POST /api/files/:id/trash - Move a file to Trash.
pub async fn trash_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state
        .files
        .move_to_trash(auth_user.user_id(), file_id)
        .await?;

    let message = format!("\"{}\" moved to Trash", file.name);
    Ok(Json(ApiResponse::success(FileResponse::from(&file), message)))
}

/// POST /api/files/:id/restore - Restore a file from Trash.
pub async fn restore_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let restored = state.files.restore(auth_user.user_id(), file_id).await?;

    let data = FileResponse::from(&restored.file);
    let response = if restored.origin_missing {
        ApiResponse::new(data).with_notice(
            NoticeLevel::Warning,
            format!(
                "\"{}\" restored to All Files because its folder no longer exists",
                restored.file.name
            ),
        )
    } else {
        ApiResponse::success(data, format!("\"{}\" restored", restored.file.name))
    };
    Ok(Json(response))
}

/// DELETE /api/files/:id - Permanently delete a trashed file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .files
        .permanently_delete(auth_user.user_id(), file_id)
        .await?;
    Ok(Json(ApiResponse::success((), "File permanently deleted")))
}

/// GET /api/trash - Files in Trash.
pub async fn list_trash(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.files.list_trash(auth_user.user_id()).await?;
    Ok(Json(ApiResponse::new(
        files.iter().map(FileResponse::from).collect(),
    )))
}

/// DELETE /api/trash - Permanently delete everything in Trash.
pub async fn empty_trash(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<EmptyTrashResponse>>, ApiError> {
    let report = state.files.empty_trash(auth_user.user_id()).await?;

    let response = if report.failed == 0 {
        ApiResponse::success(
            EmptyTrashResponse::from(report),
            format!("{} file(s) permanently deleted", report.deleted),
        )
    } else {
        ApiResponse::new(EmptyTrashResponse::from(report)).with_notice(
            NoticeLevel::Warning,
            format!(
                "{} file(s) deleted, {} could not be deleted and remain in Trash",
                report.deleted, report.failed
            ),
        )
    };
    Ok(Json(response))
}
