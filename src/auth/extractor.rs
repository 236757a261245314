//! `AdminUser` extractor for handlers that require a signed-in admin.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{auth::jwt::validate_token, errors::AppError, state::AppState};

/// Admin identified by a Bearer token in the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub admin_id: i64,
    pub email: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("invalid Authorization format, expected: Bearer <token>")
        })?;

        let claims = validate_token(token, &state.jwt)
            .map_err(|_| AppError::unauthorized("invalid or expired token"))?;

        Ok(AdminUser {
            admin_id: claims.sub,
            email: claims.email,
        })
    }
}
