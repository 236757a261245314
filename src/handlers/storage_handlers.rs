//! Serving locally stored images and the admin sweep trigger.

use crate::{
    auth::extractor::AdminUser, errors::AppError, services::image_manager::SweepReport,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/storage/{*key}` — stream an object from the local store.
pub async fn get_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let store = state
        .local_store
        .as_ref()
        .ok_or_else(|| AppError::not_found("images are not served by this host"))?;
    let (file, len) = store
        .open(&key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("object `{}` not found", key)))?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&key)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    Ok(response)
}

/// POST `/api/admin/storage/sweep`
pub async fn sweep(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<SweepReport>, AppError> {
    let report = state.images.sweep_unused().await?;
    tracing::info!(
        admin_id = admin.admin_id,
        deleted = report.deleted.len(),
        failed = report.failed,
        "storage sweep finished"
    );
    Ok(Json(report))
}

fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
