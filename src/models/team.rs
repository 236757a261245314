//! Represents a team member profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::record::require_fields;

/// A team member row. Team members carry a single portrait in `main_image`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct TeamMember {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub sort_order: i64,
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct TeamMemberFields {
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl TeamMemberFields {
    pub fn validate(&self) -> Result<(), String> {
        require_fields(&[("name", &self.name), ("role", &self.role)])
    }
}
