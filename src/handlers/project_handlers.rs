//! Project endpoints. Reads are public; writes require an admin token.

use crate::{
    auth::extractor::AdminUser,
    errors::AppError,
    handlers::upload::UploadForm,
    models::{
        project::{Project, ProjectDetail, ProjectFields},
        record::{OwnerKind, RecordFields},
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
use serde::{Deserialize, Serialize};

/// Body naming one of a record's images.
#[derive(Debug, Deserialize)]
pub struct ImageRef {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct MainImageResponse {
    pub main_image: Option<String>,
}

/// GET `/api/projects`
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.records.list_projects().await?))
}

/// GET `/api/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProjectDetail>, AppError> {
    Ok(Json(state.records.get_project(id).await?))
}

/// POST `/api/projects` — multipart with project fields and `images` files.
pub async fn create_project(
    State(state): State<AppState>,
    admin: AdminUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedRecord>), AppError> {
    let form = UploadForm::read(multipart, "images").await?;
    let fields = RecordFields::Project(ProjectFields {
        title: form.text("title"),
        description: form.text("description"),
        category: form.optional("category"),
        client: form.optional("client"),
        completion_date: form.optional("completion_date"),
    });
    let created = state.images.create_with_images(&fields, form.files).await?;
    tracing::info!(admin_id = admin.admin_id, project_id = created.id, "project created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT `/api/projects/{id}` — JSON fields only.
pub async fn update_project(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(fields): Json<ProjectFields>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(state.records.update_project(id, &fields).await?))
}

/// DELETE `/api/projects/{id}`
pub async fn delete_project(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.images.delete_record(OwnerKind::Project, id).await?;
    tracing::info!(admin_id = admin.admin_id, project_id = id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/api/projects/{id}/images` — multipart `images` files.
pub async fn append_project_images(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<String>>), AppError> {
    let form = UploadForm::read(multipart, "images").await?;
    let urls = state
        .images
        .append_images(OwnerKind::Project, id, form.files)
        .await?;
    Ok((StatusCode::CREATED, Json(urls)))
}

/// DELETE `/api/projects/{id}/images` — `{ "image_url": ... }`
pub async fn delete_project_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<ImageRef>,
) -> Result<Json<MainImageResponse>, AppError> {
    let main_image = state
        .images
        .delete_image(OwnerKind::Project, id, &body.image_url)
        .await?;
    Ok(Json(MainImageResponse { main_image }))
}

/// PUT `/api/projects/{id}/main-image` — `{ "image_url": ... }`
pub async fn set_project_main_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<ImageRef>,
) -> Result<Json<MainImageResponse>, AppError> {
    state
        .images
        .set_main_image(OwnerKind::Project, id, &body.image_url)
        .await?;
    Ok(Json(MainImageResponse {
        main_image: Some(body.image_url),
    }))
}
