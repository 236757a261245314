//! Represents a portfolio project shown on the site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{image::ImageAsset, record::require_fields};

/// A project row.
///
/// `main_image` is the locator of the image shown as the project's cover; when
/// set it always matches one of the project's `project_images` rows.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub client: Option<String>,
    /// Free-form completion date as entered by the admin (e.g. "2024-06").
    pub completion_date: Option<String>,
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project together with its images in insertion order.
#[derive(Serialize, Debug)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub images: Vec<ImageAsset>,
}

/// Editable project fields.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ProjectFields {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub client: Option<String>,
    pub completion_date: Option<String>,
}

impl ProjectFields {
    pub fn validate(&self) -> Result<(), String> {
        require_fields(&[("title", &self.title), ("description", &self.description)])
    }
}
