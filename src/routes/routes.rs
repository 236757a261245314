//! Defines every HTTP route of the CMS.
//!
//! ## Structure
//! - **Health**: `GET /healthz`, `GET /readyz`
//! - **Auth**: `/api/auth/login`, `/api/auth/me`, `/api/auth/forgot-password`,
//!   `/api/auth/reset-password`
//! - **Content**: `/api/sections/{slug}`, `/api/services[/{id}]`
//! - **Image-owning records**: `/api/projects[/{id}[/images|/main-image]]`,
//!   `/api/team[/{id}[/image]]`
//! - **Contact**: `/api/contact[/{id}[/read]]`
//! - **Storage**: `GET /storage/{*key}` for locally stored images,
//!   `POST /api/admin/storage/sweep`
//!
//! Reads are public. Writes take an admin Bearer token, enforced by the
//! `AdminUser` extractor in each handler.

use crate::{
    handlers::{
        auth_handlers, contact_handlers, content_handlers,
        health_handlers::{healthz, readyz},
        project_handlers, storage_handlers, team_handlers,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the router for all CMS routes.
///
/// `max_upload_bytes` caps request bodies, which matters for the multipart
/// image endpoints.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // auth
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/auth/me", get(auth_handlers::me))
        .route(
            "/api/auth/forgot-password",
            post(auth_handlers::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(auth_handlers::reset_password),
        )
        // landing page copy
        .route(
            "/api/sections/{slug}",
            get(content_handlers::get_section).put(content_handlers::put_section),
        )
        .route(
            "/api/services",
            get(content_handlers::list_services).post(content_handlers::create_service),
        )
        .route(
            "/api/services/{id}",
            put(content_handlers::update_service).delete(content_handlers::delete_service),
        )
        // projects
        .route(
            "/api/projects",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(project_handlers::get_project)
                .put(project_handlers::update_project)
                .delete(project_handlers::delete_project),
        )
        .route(
            "/api/projects/{id}/images",
            post(project_handlers::append_project_images)
                .delete(project_handlers::delete_project_image),
        )
        .route(
            "/api/projects/{id}/main-image",
            put(project_handlers::set_project_main_image),
        )
        // team
        .route(
            "/api/team",
            get(team_handlers::list_team).post(team_handlers::create_team_member),
        )
        .route(
            "/api/team/{id}",
            get(team_handlers::get_team_member)
                .put(team_handlers::update_team_member)
                .delete(team_handlers::delete_team_member),
        )
        .route(
            "/api/team/{id}/image",
            put(team_handlers::replace_team_image),
        )
        // contact form
        .route(
            "/api/contact",
            get(contact_handlers::list_messages).post(contact_handlers::submit_contact),
        )
        .route(
            "/api/contact/{id}",
            axum::routing::delete(contact_handlers::delete_message),
        )
        .route("/api/contact/{id}/read", put(contact_handlers::mark_read))
        // storage
        .route("/storage/{*key}", get(storage_handlers::get_object))
        .route("/api/admin/storage/sweep", post(storage_handlers::sweep))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// The full application: routes, CORS for the configured origins, and
/// request tracing.
pub fn app(state: AppState, max_upload_bytes: usize, cors_origins: &[String]) -> axum::Router {
    routes(max_upload_bytes)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
