//! src/services/content_service.rs
//!
//! Landing-page copy (hero, about) and the services list.

use crate::models::content::{Section, SectionFields, SectionSlug, Service, ServiceFields};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ContentResult<T> = Result<T, ContentError>;

#[derive(Clone)]
pub struct ContentService {
    db: Arc<SqlitePool>,
}

impl ContentService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn get_section(&self, slug: SectionSlug) -> ContentResult<Section> {
        sqlx::query_as::<_, Section>(
            "SELECT slug, title, subtitle, body, updated_at FROM site_sections WHERE slug = ?",
        )
        .bind(slug.as_str())
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| ContentError::NotFound(format!("section `{}` has not been written yet", slug)))
    }

    /// Create or overwrite a section.
    pub async fn put_section(
        &self,
        slug: SectionSlug,
        fields: &SectionFields,
    ) -> ContentResult<Section> {
        if fields.title.trim().is_empty() {
            return Err(ContentError::Validation("`title` is required".into()));
        }
        Ok(sqlx::query_as::<_, Section>(
            "INSERT INTO site_sections (slug, title, subtitle, body, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                subtitle = excluded.subtitle,
                body = excluded.body,
                updated_at = excluded.updated_at
             RETURNING slug, title, subtitle, body, updated_at",
        )
        .bind(slug.as_str())
        .bind(fields.title.trim())
        .bind(&fields.subtitle)
        .bind(&fields.body)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn list_services(&self) -> ContentResult<Vec<Service>> {
        Ok(sqlx::query_as::<_, Service>(
            "SELECT id, title, description, icon, sort_order, created_at, updated_at
             FROM services ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn create_service(&self, fields: &ServiceFields) -> ContentResult<Service> {
        validate_service(fields)?;
        let now = Utc::now();
        Ok(sqlx::query_as::<_, Service>(
            "INSERT INTO services (title, description, icon, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, title, description, icon, sort_order, created_at, updated_at",
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(&fields.icon)
        .bind(fields.sort_order)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn update_service(&self, id: i64, fields: &ServiceFields) -> ContentResult<Service> {
        validate_service(fields)?;
        sqlx::query_as::<_, Service>(
            "UPDATE services
             SET title = ?, description = ?, icon = ?, sort_order = ?, updated_at = ?
             WHERE id = ?
             RETURNING id, title, description, icon, sort_order, created_at, updated_at",
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(&fields.icon)
        .bind(fields.sort_order)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| service_not_found(id))
    }

    pub async fn delete_service(&self, id: i64) -> ContentResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(service_not_found(id));
        }
        Ok(())
    }
}

fn validate_service(fields: &ServiceFields) -> ContentResult<()> {
    if fields.title.trim().is_empty() {
        return Err(ContentError::Validation("`title` is required".into()));
    }
    Ok(())
}

fn service_not_found(id: i64) -> ContentError {
    ContentError::NotFound(format!("service {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn service() -> ContentService {
        ContentService::new(Arc::new(db::memory_pool().await.unwrap()))
    }

    #[tokio::test]
    async fn sections_upsert_in_place() {
        let content = service().await;
        assert!(matches!(
            content.get_section(SectionSlug::Hero).await,
            Err(ContentError::NotFound(_))
        ));

        content
            .put_section(
                SectionSlug::Hero,
                &SectionFields {
                    title: "Build better".into(),
                    ..SectionFields::default()
                },
            )
            .await
            .unwrap();
        let updated = content
            .put_section(
                SectionSlug::Hero,
                &SectionFields {
                    title: "Build smarter".into(),
                    subtitle: Some("Since 1998".into()),
                    body: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Build smarter");
        let fetched = content.get_section(SectionSlug::Hero).await.unwrap();
        assert_eq!(fetched.subtitle.as_deref(), Some("Since 1998"));
        assert!(matches!(
            content.get_section(SectionSlug::About).await,
            Err(ContentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn services_crud() {
        let content = service().await;
        let second = content
            .create_service(&ServiceFields {
                title: "Remodeling".into(),
                sort_order: 2,
                ..ServiceFields::default()
            })
            .await
            .unwrap();
        content
            .create_service(&ServiceFields {
                title: "Design".into(),
                sort_order: 1,
                ..ServiceFields::default()
            })
            .await
            .unwrap();

        let titles: Vec<_> = content
            .list_services()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Design", "Remodeling"]);

        let updated = content
            .update_service(
                second.id,
                &ServiceFields {
                    title: "Renovation".into(),
                    icon: Some("hammer".into()),
                    ..ServiceFields::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.icon.as_deref(), Some("hammer"));

        content.delete_service(second.id).await.unwrap();
        assert!(matches!(
            content.delete_service(second.id).await,
            Err(ContentError::NotFound(_))
        ));
        assert!(matches!(
            content.create_service(&ServiceFields::default()).await,
            Err(ContentError::Validation(_))
        ));
    }
}
