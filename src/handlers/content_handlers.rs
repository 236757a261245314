//! Landing page sections and the services list.

use crate::{
    auth::extractor::AdminUser,
    errors::AppError,
    models::content::{Section, SectionFields, SectionSlug, Service, ServiceFields},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

fn parse_slug(slug: &str) -> Result<SectionSlug, AppError> {
    slug.parse().map_err(AppError::bad_request)
}

/// GET `/api/sections/{slug}`
pub async fn get_section(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Section>, AppError> {
    Ok(Json(state.content.get_section(parse_slug(&slug)?).await?))
}

/// PUT `/api/sections/{slug}`
pub async fn put_section(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(slug): Path<String>,
    Json(fields): Json<SectionFields>,
) -> Result<Json<Section>, AppError> {
    Ok(Json(
        state.content.put_section(parse_slug(&slug)?, &fields).await?,
    ))
}

/// GET `/api/services`
pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>, AppError> {
    Ok(Json(state.content.list_services().await?))
}

/// POST `/api/services`
pub async fn create_service(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(fields): Json<ServiceFields>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let service = state.content.create_service(&fields).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// PUT `/api/services/{id}`
pub async fn update_service(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(fields): Json<ServiceFields>,
) -> Result<Json<Service>, AppError> {
    Ok(Json(state.content.update_service(id, &fields).await?))
}

/// DELETE `/api/services/{id}`
pub async fn delete_service(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.content.delete_service(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
