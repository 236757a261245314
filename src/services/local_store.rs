//! src/services/local_store.rs
//!
//! LocalObjectStore keeps object payloads on local disk beneath
//! `base_path/{key}` and exposes them under `{public_base_url}/{key}`, served
//! by the `/storage/{*key}` route.

use crate::services::object_store::{
    ObjectStore, StoreError, StoreResult, StoredObject, ensure_key_safe,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const TMP_PREFIX: &str = ".tmp-";

#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    /// Base directory on disk where object payloads are stored.
    base_path: PathBuf,

    /// Public URL prefix, without trailing slash.
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Open an object for streaming out. Returns the file and its length.
    pub async fn open(&self, key: &str) -> StoreResult<Option<(File, u64)>> {
        ensure_key_safe(key)?;
        if key.rsplit('/').next().is_some_and(|f| f.starts_with(TMP_PREFIX)) {
            return Ok(None);
        }
        match File::open(self.object_path(key)).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok(Some((file, len)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Write bytes to a temp file, fsync it, then link it into place.
    ///
    /// Linking fails if the destination exists, so an existing object is never
    /// overwritten.
    async fn write_new(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        let linked = fs::hard_link(&tmp_path, &file_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match linked {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::Conflict(key.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Recursively remove empty directories up to the base path.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<String> {
        ensure_key_safe(key)?;
        self.write_new(key, &bytes).await?;
        debug!(key, size = bytes.len(), content_type, "stored object on disk");
        Ok(key.to_string())
    }

    async fn remove(&self, keys: &[String]) -> StoreResult<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(err) = ensure_key_safe(key) {
                first_error.get_or_insert(err);
                continue;
            }
            let file_path = self.object_path(key);
            match fs::remove_file(&file_path).await {
                Ok(_) => debug!("removed physical file {}", file_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", file_path.display());
                }
                Err(err) => {
                    first_error.get_or_insert(StoreError::Io(err));
                    continue;
                }
            }
            if let Some(parent) = file_path.parent() {
                self.prune_empty_dirs(parent).await;
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<StoredObject>> {
        let dir_part = match prefix.rfind('/') {
            Some(pos) => &prefix[..pos],
            None => "",
        };
        let mut pending = vec![self.base_path.join(dir_part)];
        let mut keys = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::Io(err)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                    continue;
                }
                if let Some(key) = self.key_for(&path).filter(|k| k.starts_with(prefix)) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        keys.truncate(limit);
        Ok(keys.into_iter().map(|key| StoredObject { key }).collect())
    }

    fn public_prefix(&self) -> &str {
        &self.public_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> LocalObjectStore {
        LocalObjectStore::new(dir.path(), "http://localhost:3000/storage/")
    }

    #[tokio::test]
    async fn upload_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store
            .upload("projects/1-a.png", Bytes::from_static(b"one"), Some("image/png"))
            .await
            .unwrap();
        let err = store
            .upload("projects/1-a.png", Bytes::from_static(b"two"), Some("image/png"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        let on_disk = std::fs::read(dir.path().join("projects/1-a.png")).unwrap();
        assert_eq!(on_disk, b"one");
    }

    #[tokio::test]
    async fn list_returns_full_keys_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for key in ["projects/2-b.png", "projects/1-a.png", "team/1-c.png"] {
            store.upload(key, Bytes::from_static(b"x"), None).await.unwrap();
        }

        let listed = store.list("projects/", 10).await.unwrap();
        let keys: Vec<_> = listed.into_iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!["projects/1-a.png", "projects/2-b.png"]);
        assert!(store.list("missing/", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_tolerates_missing_objects_and_prunes_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store
            .upload("team/1-c.png", Bytes::from_static(b"x"), None)
            .await
            .unwrap();

        store
            .remove(&["team/1-c.png".to_string(), "team/nope.png".to_string()])
            .await
            .unwrap();

        assert!(!dir.path().join("team").exists());
        assert!(store.open("team/1-c.png").await.unwrap().is_none());
    }

    #[test]
    fn public_url_joins_prefix_and_key() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            store(&dir).public_url("team/1-c.png"),
            "http://localhost:3000/storage/team/1-c.png"
        );
    }
}
