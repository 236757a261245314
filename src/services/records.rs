//! Read and field-update queries for projects and team members.
//!
//! Anything that touches images goes through `ImageManager`; this service
//! only edits text columns.

use crate::{
    models::{
        image::ImageAsset,
        project::{Project, ProjectDetail, ProjectFields},
        record::OwnerKind,
        team::{TeamMember, TeamMemberFields},
    },
    services::image_manager::{RecordError, RecordResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

const PROJECT_COLUMNS: &str = "id, title, description, category, client, completion_date, \
                               main_image, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, role, bio, sort_order, main_image, created_at, updated_at";

#[derive(Clone)]
pub struct RecordService {
    db: Arc<SqlitePool>,
}

impl RecordService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn list_projects(&self) -> RecordResult<Vec<Project>> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, id DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn get_project(&self, id: i64) -> RecordResult<ProjectDetail> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| RecordError::NotFound(format!("project {} not found", id)))?;
        let images = self.images(OwnerKind::Project, id).await?;
        Ok(ProjectDetail { project, images })
    }

    pub async fn update_project(&self, id: i64, fields: &ProjectFields) -> RecordResult<Project> {
        fields.validate().map_err(RecordError::Validation)?;
        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects
             SET title = ?, description = ?, category = ?, client = ?, completion_date = ?,
                 updated_at = ?
             WHERE id = ?
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(fields.title.trim())
        .bind(fields.description.trim())
        .bind(&fields.category)
        .bind(&fields.client)
        .bind(&fields.completion_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| RecordError::NotFound(format!("project {} not found", id)))
    }

    pub async fn list_team(&self) -> RecordResult<Vec<TeamMember>> {
        Ok(sqlx::query_as::<_, TeamMember>(&format!(
            "SELECT {} FROM team_members ORDER BY sort_order ASC, id ASC",
            TEAM_COLUMNS
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn get_team_member(&self, id: i64) -> RecordResult<TeamMember> {
        sqlx::query_as::<_, TeamMember>(&format!(
            "SELECT {} FROM team_members WHERE id = ?",
            TEAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| RecordError::NotFound(format!("team member {} not found", id)))
    }

    pub async fn update_team_member(
        &self,
        id: i64,
        fields: &TeamMemberFields,
    ) -> RecordResult<TeamMember> {
        fields.validate().map_err(RecordError::Validation)?;
        sqlx::query_as::<_, TeamMember>(&format!(
            "UPDATE team_members
             SET name = ?, role = ?, bio = ?, sort_order = ?, updated_at = ?
             WHERE id = ?
             RETURNING {}",
            TEAM_COLUMNS
        ))
        .bind(fields.name.trim())
        .bind(fields.role.trim())
        .bind(&fields.bio)
        .bind(fields.sort_order)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| RecordError::NotFound(format!("team member {} not found", id)))
    }

    /// Images of a record in insertion order.
    pub async fn images(&self, kind: OwnerKind, id: i64) -> RecordResult<Vec<ImageAsset>> {
        Ok(sqlx::query_as::<_, ImageAsset>(&format!(
            "SELECT id, image_url, created_at FROM {} WHERE {} = ? ORDER BY id ASC",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .fetch_all(&*self.db)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::{image::UploadFile, record::RecordFields},
        services::{image_manager::ImageManager, object_store::testing::MemoryStore},
    };

    async fn setup() -> (RecordService, ImageManager) {
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let manager = ImageManager::new(pool.clone(), Arc::new(MemoryStore::new()));
        (RecordService::new(pool), manager)
    }

    fn project_fields(title: &str) -> ProjectFields {
        ProjectFields {
            title: title.into(),
            description: "Kitchen and bath".into(),
            category: Some("residential".into()),
            ..ProjectFields::default()
        }
    }

    #[tokio::test]
    async fn project_detail_lists_images_in_order() {
        let (records, manager) = setup().await;
        let created = manager
            .create_with_images(
                &RecordFields::Project(project_fields("Maple St")),
                vec![
                    UploadFile::new("a.png", Some("image/png"), &b"a"[..]),
                    UploadFile::new("b.png", Some("image/png"), &b"b"[..]),
                ],
            )
            .await
            .unwrap();

        let detail = records.get_project(created.id).await.unwrap();

        assert_eq!(detail.project.title, "Maple St");
        let urls: Vec<_> = detail.images.into_iter().map(|i| i.image_url).collect();
        assert_eq!(urls, created.image_urls);
        assert_eq!(detail.project.main_image.as_deref(), Some(urls[0].as_str()));
    }

    #[tokio::test]
    async fn update_project_keeps_main_image() {
        let (records, manager) = setup().await;
        let created = manager
            .create_with_images(
                &RecordFields::Project(project_fields("Maple St")),
                vec![UploadFile::new("a.png", Some("image/png"), &b"a"[..])],
            )
            .await
            .unwrap();

        let updated = records
            .update_project(created.id, &project_fields("Maple Street"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Maple Street");
        assert_eq!(updated.main_image.as_deref(), Some(created.image_urls[0].as_str()));
        assert!(matches!(
            records.update_project(999, &project_fields("x")).await,
            Err(RecordError::NotFound(_))
        ));
        assert!(matches!(
            records.update_project(created.id, &project_fields(" ")).await,
            Err(RecordError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn team_is_ordered_by_sort_order() {
        let (records, manager) = setup().await;
        for (name, order) in [("Zoe", 2), ("Ari", 1)] {
            manager
                .create_with_images(
                    &RecordFields::TeamMember(TeamMemberFields {
                        name: name.into(),
                        role: "Designer".into(),
                        bio: None,
                        sort_order: order,
                    }),
                    vec![UploadFile::new("p.jpg", Some("image/jpeg"), &b"p"[..])],
                )
                .await
                .unwrap();
        }

        let names: Vec<_> = records
            .list_team()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Ari", "Zoe"]);
    }
}
