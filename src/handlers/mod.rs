//! HTTP handlers. Each delegates to a service on `AppState` and maps its
//! errors through `AppError`.

pub mod auth_handlers;
pub mod contact_handlers;
pub mod content_handlers;
pub mod health_handlers;
pub mod project_handlers;
pub mod storage_handlers;
pub mod team_handlers;
pub mod upload;
