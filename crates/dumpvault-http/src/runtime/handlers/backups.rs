//! Backup management HTTP handlers
//!
//! Create, list, download, delete and restore. Create and restore run on a
//! spawned task so an abandoned request never interrupts a client process
//! halfway through.

use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use dumpvault_core::{BackupError, RestoreUpload, human_size};
use tracing::info;

use crate::runtime::{
    AppState,
    error::ApiError,
    types::{
        BackupInfo, CreateBackupResponse, ErrorResponse, ListBackupsResponse, MessageResponse,
        RestoreForm,
    },
};

/// Multipart field carrying the dump on restore
pub const RESTORE_FIELD: &str = "backup_file";

/// POST /backups - Dump the configured database into a new file
#[utoipa::path(
    post,
    path = "/backups",
    tag = "backups",
    responses(
        (status = 201, description = "Backup created", body = CreateBackupResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 409, description = "Another operation is running", body = ErrorResponse),
        (status = 502, description = "Database or client tool failed", body = ErrorResponse),
        (status = 504, description = "Client tool timed out", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_backup(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateBackupResponse>), ApiError> {
    let service = state.service.clone();
    let report = tokio::spawn(async move { service.create_backup().await })
        .await
        .map_err(|e| ApiError::Internal(format!("backup task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(CreateBackupResponse {
            success: true,
            message: "Backup created successfully".to_string(),
            size_human: human_size(report.size_bytes),
            filename: report.filename,
            size_bytes: report.size_bytes,
            skipped_tables: report.skipped.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// GET /backups - List dump files, newest first
#[utoipa::path(
    get,
    path = "/backups",
    tag = "backups",
    responses(
        (status = 200, description = "Backups, newest first", body = ListBackupsResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_backups(
    State(state): State<AppState>,
) -> Result<Json<ListBackupsResponse>, ApiError> {
    let backups: Vec<BackupInfo> = state
        .service
        .list_backups()
        .await?
        .into_iter()
        .map(BackupInfo::from)
        .collect();

    Ok(Json(ListBackupsResponse {
        success: true,
        total: backups.len(),
        backups,
    }))
}

/// GET /backups/{filename} - Download a dump file
#[utoipa::path(
    get,
    path = "/backups/{filename}",
    tag = "backups",
    params(("filename" = String, Path, description = "Backup file name")),
    responses(
        (status = 200, description = "Dump contents", content_type = "application/sql", body = String),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Backup not found", body = ErrorResponse),
        (status = 422, description = "Invalid file name", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (entry, bytes) = state.service.read_backup(&filename).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/sql".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", entry.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /backups/{filename} - Remove a dump file
#[utoipa::path(
    delete,
    path = "/backups/{filename}",
    tag = "backups",
    params(("filename" = String, Path, description = "Backup file name")),
    responses(
        (status = 200, description = "Backup deleted", body = MessageResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Backup not found", body = ErrorResponse),
        (status = 422, description = "Invalid file name", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete_backup(&filename).await?;
    Ok(Json(MessageResponse::ok(format!(
        "Backup '{filename}' deleted successfully"
    ))))
}

/// POST /backups/restore - Replay an uploaded dump into the database
#[utoipa::path(
    post,
    path = "/backups/restore",
    tag = "backups",
    request_body(content = RestoreForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Database restored", body = MessageResponse),
        (status = 400, description = "Malformed multipart body", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 409, description = "Another operation is running", body = ErrorResponse),
        (status = 422, description = "Upload rejected", body = ErrorResponse),
        (status = 502, description = "Client tool failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_backup(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(RESTORE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some(RestoreUpload::new(file_name, bytes.to_vec()));
        break;
    }

    let upload = upload.ok_or_else(|| {
        ApiError::Backup(BackupError::ValidationFailure(format!(
            "multipart field '{RESTORE_FIELD}' is required"
        )))
    })?;

    let service = state.service.clone();
    let report = tokio::spawn(async move { service.restore_upload(upload).await })
        .await
        .map_err(|e| ApiError::Internal(format!("restore task failed: {e}")))??;

    info!(source = %report.source, size_bytes = report.size_bytes, "Restore request completed");
    Ok(Json(MessageResponse::ok(format!(
        "Database restored from '{}'",
        report.source
    ))))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Backup(BackupError::ValidationFailure(
            "uploaded file exceeds the maximum allowed size".to_string(),
        ))
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
