//! src/services/object_store.rs
//!
//! The object storage boundary. Provider responses are normalized into
//! `StoreResult` here so the rest of the crate only ever matches on
//! `StoreError` variants.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` already exists")]
    Conflict(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("storage provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// An object physically present in the store, addressed by its full key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
}

/// Object storage used for uploaded images.
///
/// Implementations must refuse to overwrite an existing key and must expose
/// every uploaded object under `public_url(key)`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`. Returns the key the object was stored as.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: Option<&str>)
    -> StoreResult<String>;

    /// Delete objects. Keys that are already gone are not an error.
    async fn remove(&self, keys: &[String]) -> StoreResult<()>;

    /// List up to `limit` objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<StoredObject>>;

    /// URL prefix shared by every public object URL, without trailing slash.
    fn public_prefix(&self) -> &str;

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_prefix().trim_end_matches('/'), key)
    }
}

/// Basic key validation shared by the backends.
///
/// Rejects empty or overlong keys, absolute keys, `..` segments, and control
/// characters.
pub fn ensure_key_safe(key: &str) -> StoreResult<()> {
    const MAX_OBJECT_KEY_LEN: usize = 1024;

    let invalid = key.is_empty()
        || key.len() > MAX_OBJECT_KEY_LEN
        || key.starts_with('/')
        || key.contains("..")
        || key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        assert!(ensure_key_safe("projects/1-a.png").is_ok());
        assert!(ensure_key_safe("").is_err());
        assert!(ensure_key_safe("/etc/passwd").is_err());
        assert!(ensure_key_safe("projects/../../secret").is_err());
        assert!(ensure_key_safe("team\\a.png").is_err());
    }
}
