//! Core data models for the site content backend.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod admin;
pub mod contact;
pub mod content;
pub mod image;
pub mod project;
pub mod record;
pub mod team;
