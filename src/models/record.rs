//! Records that own uploaded images, and the fields used to create them.

use serde::{Deserialize, Serialize};

use super::{project::ProjectFields, team::TeamMemberFields};

/// The kinds of rows that own images.
///
/// Each kind maps to a record table, an images table keyed by a foreign key
/// column, and a folder under which its objects are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Project,
    TeamMember,
}

impl OwnerKind {
    pub const ALL: [OwnerKind; 2] = [OwnerKind::Project, OwnerKind::TeamMember];

    pub fn record_table(self) -> &'static str {
        match self {
            OwnerKind::Project => "projects",
            OwnerKind::TeamMember => "team_members",
        }
    }

    pub fn image_table(self) -> &'static str {
        match self {
            OwnerKind::Project => "project_images",
            OwnerKind::TeamMember => "team_member_images",
        }
    }

    pub fn owner_column(self) -> &'static str {
        match self {
            OwnerKind::Project => "project_id",
            OwnerKind::TeamMember => "team_member_id",
        }
    }

    /// Object store folder for this kind's uploads.
    pub fn folder(self) -> &'static str {
        match self {
            OwnerKind::Project => "projects",
            OwnerKind::TeamMember => "team",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OwnerKind::Project => "project",
            OwnerKind::TeamMember => "team member",
        }
    }
}

/// Fields for a new image-owning record.
#[derive(Debug, Clone)]
pub enum RecordFields {
    Project(ProjectFields),
    TeamMember(TeamMemberFields),
}

impl RecordFields {
    pub fn kind(&self) -> OwnerKind {
        match self {
            RecordFields::Project(_) => OwnerKind::Project,
            RecordFields::TeamMember(_) => OwnerKind::TeamMember,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            RecordFields::Project(fields) => fields.validate(),
            RecordFields::TeamMember(fields) => fields.validate(),
        }
    }
}

/// Returns an error message naming the first blank required field.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), String> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(format!("`{}` is required", name)),
        None => Ok(()),
    }
}
