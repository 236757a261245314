//! src/services/image_manager.rs
//!
//! ImageManager keeps image-owning records (projects, team members), their
//! image rows, and the objects in the store consistent with each other.
//!
//! Every write follows the same order: upload first, then persist inside one
//! transaction, then delete whatever the committed state no longer needs.
//! When persisting fails after an upload succeeded, the transaction is rolled
//! back and the new objects are removed best-effort. Store deletions that fail
//! are logged as cleanup warnings and left for [`ImageManager::sweep_unused`].

use crate::{
    models::{
        image::UploadFile,
        record::{OwnerKind, RecordFields},
    },
    services::{
        locator::{LocatorKind, classify, generate_key, key_timestamp},
        object_store::{ObjectStore, StoreError},
    },
};
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

const SWEEP_LIST_LIMIT: usize = 10_000;
const SWEEP_REMOVE_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("image upload failed: {0}")]
    Upload(#[source] StoreError),
    #[error("storage returned a locator that cannot be persisted: `{0}`")]
    InvalidLocator(String),
    #[error("object storage unavailable: {0}")]
    Storage(#[source] StoreError),
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Result of a successful create.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRecord {
    pub id: i64,
    pub image_urls: Vec<String>,
}

/// Outcome of a maintenance sweep over the store.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub referenced: usize,
    pub skipped_recent: usize,
    pub deleted: Vec<String>,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ImageManager {
    db: Arc<SqlitePool>,
    store: Arc<dyn ObjectStore>,
    /// Objects younger than this are never swept, so uploads that have not
    /// committed yet are left alone.
    sweep_min_age: Duration,
}

impl ImageManager {
    pub fn new(db: Arc<SqlitePool>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            store,
            sweep_min_age: Duration::hours(1),
        }
    }

    pub fn with_sweep_min_age(mut self, age: Duration) -> Self {
        self.sweep_min_age = age;
        self
    }

    /// Create a record and its images. The first file becomes the main image.
    pub async fn create_with_images(
        &self,
        fields: &RecordFields,
        files: Vec<UploadFile>,
    ) -> RecordResult<CreatedRecord> {
        let kind = fields.kind();
        fields.validate().map_err(RecordError::Validation)?;
        validate_files(kind, &files)?;

        let keys = self.upload_all(kind, files).await?;
        let urls: Vec<String> = keys.iter().map(|key| self.store.public_url(key)).collect();

        match self.persist_new_record(fields, &urls).await {
            Ok(id) => {
                info!(kind = kind.label(), id, images = urls.len(), "created record");
                Ok(CreatedRecord {
                    id,
                    image_urls: urls,
                })
            }
            Err(err) => {
                warn!(kind = kind.label(), error = %err, "record insert failed, removing uploads");
                self.remove_keys(&keys, "record insert rolled back").await;
                Err(err)
            }
        }
    }

    /// Add images to an existing record.
    ///
    /// The first new image becomes main only when the record has none.
    pub async fn append_images(
        &self,
        kind: OwnerKind,
        id: i64,
        files: Vec<UploadFile>,
    ) -> RecordResult<Vec<String>> {
        validate_files(kind, &files)?;
        self.ensure_record_exists(kind, id).await?;

        let keys = self.upload_all(kind, files).await?;
        let urls: Vec<String> = keys.iter().map(|key| self.store.public_url(key)).collect();

        match self.persist_appended(kind, id, &urls).await {
            Ok(()) => {
                info!(kind = kind.label(), id, images = urls.len(), "appended images");
                Ok(urls)
            }
            Err(err) => {
                warn!(kind = kind.label(), id, error = %err, "append failed, removing uploads");
                self.remove_keys(&keys, "image append rolled back").await;
                Err(err)
            }
        }
    }

    /// Remove one image from a record. Returns the record's main image after
    /// the removal.
    pub async fn delete_image(
        &self,
        kind: OwnerKind,
        id: i64,
        locator: &str,
    ) -> RecordResult<Option<String>> {
        let image_id = self.find_owned_image(kind, id, locator).await?;

        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ?",
            kind.image_table()
        ))
        .bind(image_id)
        .execute(&mut *tx)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(image_not_found(kind, id, locator));
        }

        let main = fetch_main_image(&mut tx, kind, id).await?.flatten();
        let new_main = if main.as_deref() == Some(locator) {
            let next: Option<String> = sqlx::query_scalar(&format!(
                "SELECT image_url FROM {} WHERE {} = ? ORDER BY id ASC LIMIT 1",
                kind.image_table(),
                kind.owner_column()
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            update_main_image(&mut tx, kind, id, next.as_deref()).await?;
            next
        } else {
            main
        };
        tx.commit().await?;

        info!(kind = kind.label(), id, locator, "deleted image");
        self.remove_locators(&[locator.to_string()], "image deleted").await;
        Ok(new_main)
    }

    /// Point the record's main image at one of its existing images.
    ///
    /// Ownership is checked in the same statement as the write, so a
    /// concurrent `delete_image` cannot leave main pointing at a removed row.
    pub async fn set_main_image(&self, kind: OwnerKind, id: i64, locator: &str) -> RecordResult<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {} SET main_image = ?, updated_at = ?
             WHERE id = ? AND EXISTS (SELECT 1 FROM {} WHERE {} = ? AND image_url = ?)",
            kind.record_table(),
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(locator)
        .bind(Utc::now())
        .bind(id)
        .bind(id)
        .bind(locator)
        .execute(&*self.db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(image_not_found(kind, id, locator));
        }
        debug!(kind = kind.label(), id, locator, "set main image");
        Ok(())
    }

    /// Delete a record, its image rows, and (best-effort) its objects.
    pub async fn delete_record(&self, kind: OwnerKind, id: i64) -> RecordResult<usize> {
        let main = fetch_main_image_from(&self.db, kind, id)
            .await?
            .ok_or_else(|| record_not_found(kind, id))?;
        let mut locators = self.image_urls(kind, id).await?;
        if let Some(main) = main {
            if !locators.contains(&main) {
                locators.push(main);
            }
        }

        self.remove_locators(&locators, "record deleted").await;

        let mut tx = self.db.begin().await?;
        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ?",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.record_table()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(record_not_found(kind, id));
        }
        tx.commit().await?;

        info!(kind = kind.label(), id, images = locators.len(), "deleted record");
        Ok(locators.len())
    }

    /// Swap a single-image record's image for a new upload.
    ///
    /// The previous objects are deleted only after the new reference commits,
    /// so a failed update leaves the old image fully intact.
    pub async fn replace_image(
        &self,
        kind: OwnerKind,
        id: i64,
        file: UploadFile,
    ) -> RecordResult<String> {
        validate_files(kind, std::slice::from_ref(&file))?;
        self.ensure_record_exists(kind, id).await?;

        let keys = self.upload_all(kind, vec![file]).await?;
        let url = self.store.public_url(&keys[0]);

        match self.install_replacement(kind, id, &url).await {
            Ok(previous) => {
                info!(kind = kind.label(), id, replaced = previous.len(), "replaced image");
                self.remove_locators(&previous, "image replaced").await;
                Ok(url)
            }
            Err(err) => {
                warn!(kind = kind.label(), id, error = %err, "replacement failed, removing upload");
                self.remove_keys(&keys, "image replacement rolled back").await;
                Err(err)
            }
        }
    }

    /// Cheap reachability probe for readiness checks.
    pub async fn check_store(&self) -> Result<(), StoreError> {
        self.store
            .list(&format!("{}/", OwnerKind::Project.folder()), 1)
            .await
            .map(|_| ())
    }

    /// Delete stored objects that no database row references.
    pub async fn sweep_unused(&self) -> RecordResult<SweepReport> {
        let referenced = self.referenced_keys().await?;
        let cutoff = Utc::now() - self.sweep_min_age;
        let mut report = SweepReport {
            referenced: referenced.len(),
            ..SweepReport::default()
        };

        let mut unused = Vec::new();
        for kind in OwnerKind::ALL {
            let prefix = format!("{}/", kind.folder());
            let objects = self
                .store
                .list(&prefix, SWEEP_LIST_LIMIT)
                .await
                .map_err(RecordError::Storage)?;
            report.scanned += objects.len();
            for object in objects {
                if referenced.contains(&object.key) {
                    continue;
                }
                if key_timestamp(&object.key).is_some_and(|uploaded| uploaded > cutoff) {
                    report.skipped_recent += 1;
                    continue;
                }
                unused.push(object.key);
            }
        }

        for batch in unused.chunks(SWEEP_REMOVE_BATCH) {
            match self.store.remove(batch).await {
                Ok(()) => report.deleted.extend_from_slice(batch),
                Err(err) => {
                    warn!(count = batch.len(), error = %err, "cleanup warning: sweep removal failed");
                    report.failed += batch.len();
                }
            }
        }

        info!(
            scanned = report.scanned,
            deleted = report.deleted.len(),
            failed = report.failed,
            "storage sweep finished"
        );
        Ok(report)
    }

    async fn upload_all(&self, kind: OwnerKind, files: Vec<UploadFile>) -> RecordResult<Vec<String>> {
        let uploads = files.into_iter().map(|file| {
            let key = generate_key(kind.folder(), &file.file_name);
            async move {
                let result = self
                    .store
                    .upload(&key, file.bytes, file.content_type.as_deref())
                    .await;
                (key, result)
            }
        });

        let mut stored = Vec::new();
        let mut first_error = None;
        for (key, result) in join_all(uploads).await {
            match result {
                Ok(stored_key) => stored.push(stored_key),
                Err(err) => {
                    warn!(key = %key, error = %err, "upload failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => {
                self.remove_keys(&stored, "sibling upload failed").await;
                Err(RecordError::Upload(err))
            }
            None => Ok(stored),
        }
    }

    async fn persist_new_record(&self, fields: &RecordFields, urls: &[String]) -> RecordResult<i64> {
        let kind = fields.kind();
        let mut tx = self.db.begin().await?;
        let id = insert_record(&mut tx, fields).await?;
        self.insert_images(&mut tx, kind, id, urls).await?;
        update_main_image(&mut tx, kind, id, urls.first().map(String::as_str)).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn persist_appended(&self, kind: OwnerKind, id: i64, urls: &[String]) -> RecordResult<()> {
        let mut tx = self.db.begin().await?;
        let main = fetch_main_image(&mut tx, kind, id)
            .await?
            .ok_or_else(|| record_not_found(kind, id))?;
        self.insert_images(&mut tx, kind, id, urls).await?;
        if main.is_none() {
            update_main_image(&mut tx, kind, id, urls.first().map(String::as_str)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn install_replacement(&self, kind: OwnerKind, id: i64, url: &str) -> RecordResult<Vec<String>> {
        let mut tx = self.db.begin().await?;
        let main = fetch_main_image(&mut tx, kind, id)
            .await?
            .ok_or_else(|| record_not_found(kind, id))?;
        let mut previous: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT image_url FROM {} WHERE {} = ? ORDER BY id ASC",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        if let Some(main) = main {
            if !previous.contains(&main) {
                previous.push(main);
            }
        }

        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ?",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        self.insert_images(&mut tx, kind, id, &[url.to_string()]).await?;
        update_main_image(&mut tx, kind, id, Some(url)).await?;
        tx.commit().await?;
        Ok(previous)
    }

    async fn insert_images(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        kind: OwnerKind,
        id: i64,
        urls: &[String],
    ) -> RecordResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}, image_url, created_at) VALUES (?, ?, ?)",
            kind.image_table(),
            kind.owner_column()
        );
        for url in urls {
            self.ensure_persistable(url)?;
            sqlx::query(&sql)
                .bind(id)
                .bind(url)
                .bind(Utc::now())
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Only URLs under the store's public prefix are written to the database.
    fn ensure_persistable(&self, url: &str) -> RecordResult<()> {
        match classify(url) {
            kind @ LocatorKind::External(_) if kind.store_key(self.store.public_prefix()).is_some() => {
                Ok(())
            }
            _ => Err(RecordError::InvalidLocator(url.to_string())),
        }
    }

    async fn ensure_record_exists(&self, kind: OwnerKind, id: i64) -> RecordResult<()> {
        fetch_main_image_from(&self.db, kind, id)
            .await?
            .map(|_| ())
            .ok_or_else(|| record_not_found(kind, id))
    }

    async fn find_owned_image(&self, kind: OwnerKind, id: i64, locator: &str) -> RecordResult<i64> {
        sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE {} = ? AND image_url = ? ORDER BY id ASC LIMIT 1",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .bind(locator)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| image_not_found(kind, id, locator))
    }

    async fn image_urls(&self, kind: OwnerKind, id: i64) -> RecordResult<Vec<String>> {
        Ok(sqlx::query_scalar(&format!(
            "SELECT image_url FROM {} WHERE {} = ? ORDER BY id ASC",
            kind.image_table(),
            kind.owner_column()
        ))
        .bind(id)
        .fetch_all(&*self.db)
        .await?)
    }

    async fn referenced_keys(&self) -> RecordResult<HashSet<String>> {
        let folders: Vec<&str> = OwnerKind::ALL.iter().map(|kind| kind.folder()).collect();
        let prefix = self.store.public_prefix();
        let mut keys = HashSet::new();
        for kind in OwnerKind::ALL {
            let locators: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT image_url FROM {} UNION SELECT main_image FROM {} WHERE main_image IS NOT NULL",
                kind.image_table(),
                kind.record_table()
            ))
            .fetch_all(&*self.db)
            .await?;
            for locator in locators {
                keys.extend(classify(&locator).protected_keys(prefix, &folders));
            }
        }
        Ok(keys)
    }

    /// Best-effort removal of objects behind database locators.
    async fn remove_locators(&self, locators: &[String], reason: &str) {
        let mut keys = Vec::new();
        for locator in locators {
            match classify(locator) {
                LocatorKind::LegacyLocal(path) => {
                    info!(locator = %path, reason, "legacy local image, not deleted from store");
                }
                kind => match kind.store_key(self.store.public_prefix()) {
                    Some(key) => keys.push(key),
                    None => warn!(locator = %locator, reason, "locator is outside the store, not deleted"),
                },
            }
        }
        self.remove_keys(&keys, reason).await;
    }

    /// Best-effort removal of objects. Failures are logged, never returned.
    async fn remove_keys(&self, keys: &[String], reason: &str) {
        if keys.is_empty() {
            return;
        }
        match self.store.remove(keys).await {
            Ok(()) => debug!(count = keys.len(), reason, "removed stored objects"),
            Err(err) => warn!(
                keys = ?keys,
                reason,
                error = %err,
                "cleanup warning: failed to remove stored objects"
            ),
        }
    }
}

fn validate_files(kind: OwnerKind, files: &[UploadFile]) -> RecordResult<()> {
    if files.is_empty() {
        return Err(RecordError::Validation(format!(
            "at least one image is required for a {}",
            kind.label()
        )));
    }
    files
        .iter()
        .try_for_each(UploadFile::validate)
        .map_err(RecordError::Validation)
}

fn record_not_found(kind: OwnerKind, id: i64) -> RecordError {
    RecordError::NotFound(format!("{} {} not found", kind.label(), id))
}

fn image_not_found(kind: OwnerKind, id: i64, locator: &str) -> RecordError {
    RecordError::NotFound(format!(
        "image `{}` does not belong to {} {}",
        locator,
        kind.label(),
        id
    ))
}

async fn insert_record(tx: &mut Transaction<'_, Sqlite>, fields: &RecordFields) -> RecordResult<i64> {
    let now = Utc::now();
    let id = match fields {
        RecordFields::Project(p) => {
            sqlx::query_scalar(
                "INSERT INTO projects (title, description, category, client, completion_date,
                                       main_image, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
                 RETURNING id",
            )
            .bind(p.title.trim())
            .bind(p.description.trim())
            .bind(&p.category)
            .bind(&p.client)
            .bind(&p.completion_date)
            .bind(now)
            .bind(now)
            .fetch_one(&mut **tx)
            .await?
        }
        RecordFields::TeamMember(m) => {
            sqlx::query_scalar(
                "INSERT INTO team_members (name, role, bio, sort_order, main_image, created_at, updated_at)
                 VALUES (?, ?, ?, ?, NULL, ?, ?)
                 RETURNING id",
            )
            .bind(m.name.trim())
            .bind(m.role.trim())
            .bind(&m.bio)
            .bind(m.sort_order)
            .bind(now)
            .bind(now)
            .fetch_one(&mut **tx)
            .await?
        }
    };
    Ok(id)
}

/// `None` when the record does not exist; `Some(None)` when it has no main image.
async fn fetch_main_image(
    tx: &mut Transaction<'_, Sqlite>,
    kind: OwnerKind,
    id: i64,
) -> RecordResult<Option<Option<String>>> {
    Ok(sqlx::query_scalar(&format!(
        "SELECT main_image FROM {} WHERE id = ?",
        kind.record_table()
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?)
}

async fn fetch_main_image_from(
    db: &SqlitePool,
    kind: OwnerKind,
    id: i64,
) -> RecordResult<Option<Option<String>>> {
    Ok(sqlx::query_scalar(&format!(
        "SELECT main_image FROM {} WHERE id = ?",
        kind.record_table()
    ))
    .bind(id)
    .fetch_optional(db)
    .await?)
}

async fn update_main_image(
    tx: &mut Transaction<'_, Sqlite>,
    kind: OwnerKind,
    id: i64,
    locator: Option<&str>,
) -> RecordResult<()> {
    sqlx::query(&format!(
        "UPDATE {} SET main_image = ?, updated_at = ? WHERE id = ?",
        kind.record_table()
    ))
    .bind(locator)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
