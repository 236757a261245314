//! Admin sign-in and password reset endpoints.

use crate::{
    auth::{extractor::AdminUser, jwt::IssuedToken},
    errors::AppError,
    models::admin::Admin,
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// POST `/api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    Ok(Json(state.auth.login(&body.email, &body.password).await?))
}

/// GET `/api/auth/me`
pub async fn me(State(state): State<AppState>, admin: AdminUser) -> Result<Json<Admin>, AppError> {
    Ok(Json(state.auth.get_admin(admin.admin_id).await?))
}

/// POST `/api/auth/forgot-password`
///
/// Always 202 so the response does not reveal which emails are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.forgot_password(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST `/api/auth/reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.reset_password(&body.token, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
