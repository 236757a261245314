use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{
    auth_service::AuthError, content_service::ContentError, image_manager::RecordError,
    object_store::StoreError,
};

/// An HTTP-facing error: a status and a message safe to show clients.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Logs the detail and returns a generic 500.
    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!(error = %msg, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(msg) => AppError::bad_request(msg),
            RecordError::NotFound(msg) => AppError::not_found(msg),
            RecordError::Upload(StoreError::InvalidKey(key)) => {
                AppError::bad_request(format!("invalid object key `{}`", key))
            }
            err @ (RecordError::Upload(_) | RecordError::Storage(_)) => {
                tracing::warn!(error = %err, "object storage failure");
                AppError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            err @ (RecordError::InvalidLocator(_) | RecordError::Persistence(_)) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(msg) => AppError::bad_request(msg),
            ContentError::NotFound(msg) => AppError::not_found(msg),
            ContentError::Sqlx(err) => AppError::internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized(err.to_string()),
            AuthError::InvalidResetToken | AuthError::Validation(_) => {
                AppError::bad_request(err.to_string())
            }
            AuthError::AdminNotFound(_) => AppError::unauthorized("admin account no longer exists"),
            AuthError::Token(_) | AuthError::Hash(_) | AuthError::Sqlx(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(_) => AppError::bad_request(err.to_string()),
            StoreError::Conflict(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            other => AppError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_map_to_statuses() {
        let cases = [
            (RecordError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (RecordError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                RecordError::Upload(StoreError::Status {
                    status: 500,
                    body: String::new(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RecordError::InvalidLocator("/uploads/a.png".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(ContentError::Sqlx(sqlx::Error::RowNotFound));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }
}
