//! Contact form. Submitting is public, the inbox is admin-only.

use crate::{
    auth::extractor::AdminUser,
    errors::AppError,
    models::contact::{ContactMessage, ContactRequest},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// POST `/api/contact`
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactMessage>), AppError> {
    let message = state.contact.submit(&request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET `/api/contact`
pub async fn list_messages(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    Ok(Json(state.contact.list().await?))
}

/// PUT `/api/contact/{id}/read`
pub async fn mark_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.contact.mark_read(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/api/contact/{id}`
pub async fn delete_message(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.contact.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
