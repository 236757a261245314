//! Team member endpoints. Each member has exactly one portrait.

use crate::{
    auth::extractor::AdminUser,
    errors::AppError,
    handlers::upload::UploadForm,
    models::{
        record::{OwnerKind, RecordFields},
        team::{TeamMember, TeamMemberFields},
    },
    services::image_manager::CreatedRecord,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image_url: String,
}

/// GET `/api/team`
pub async fn list_team(State(state): State<AppState>) -> Result<Json<Vec<TeamMember>>, AppError> {
    Ok(Json(state.records.list_team().await?))
}

/// GET `/api/team/{id}`
pub async fn get_team_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TeamMember>, AppError> {
    Ok(Json(state.records.get_team_member(id).await?))
}

/// POST `/api/team` — multipart with member fields and one `image` file.
pub async fn create_team_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedRecord>), AppError> {
    let form = UploadForm::read(multipart, "image").await?;
    if form.files.len() > 1 {
        return Err(AppError::bad_request("a team member takes exactly one image"));
    }
    let fields = RecordFields::TeamMember(TeamMemberFields {
        name: form.text("name"),
        role: form.text("role"),
        bio: form.optional("bio"),
        sort_order: form.integer("sort_order")?,
    });
    let created = state.images.create_with_images(&fields, form.files).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT `/api/team/{id}` — JSON fields only.
pub async fn update_team_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(fields): Json<TeamMemberFields>,
) -> Result<Json<TeamMember>, AppError> {
    Ok(Json(state.records.update_team_member(id, &fields).await?))
}

/// PUT `/api/team/{id}/image` — multipart with one `image` file.
pub async fn replace_team_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, AppError> {
    let mut form = UploadForm::read(multipart, "image").await?;
    if form.files.len() != 1 {
        return Err(AppError::bad_request("exactly one image is required"));
    }
    let file = form.files.remove(0);
    let image_url = state
        .images
        .replace_image(OwnerKind::TeamMember, id, file)
        .await?;
    Ok(Json(ImageResponse { image_url }))
}

/// DELETE `/api/team/{id}`
pub async fn delete_team_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.images.delete_record(OwnerKind::TeamMember, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
