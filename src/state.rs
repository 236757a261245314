//! Shared state handed to every handler.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    auth::jwt::JwtConfig,
    services::{
        auth_service::AuthService, contact_service::ContactService,
        content_service::ContentService, image_manager::ImageManager,
        local_store::LocalObjectStore, records::RecordService,
    },
};

/// Process-wide handles, constructed once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub images: ImageManager,
    pub records: RecordService,
    pub content: ContentService,
    pub contact: ContactService,
    pub auth: AuthService,
    pub jwt: Arc<JwtConfig>,
    /// Set when objects live on this server's disk and are served by
    /// `/storage/{*key}`.
    pub local_store: Option<Arc<LocalObjectStore>>,
}
