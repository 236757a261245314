//! Image rows and the uploads that produce them.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One image belonging to an owning record.
///
/// `id` follows insertion order, which is what picks the replacement main
/// image when the current one is removed.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct ImageAsset {
    pub id: i64,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A file received from a client, not yet stored anywhere.
#[derive(Clone, Debug)]
pub struct UploadFile {
    /// Original filename as sent by the client; only its extension is kept.
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bytes.is_empty() {
            return Err(format!("file `{}` is empty", self.file_name));
        }
        match self.content_type.as_deref() {
            Some(ct) if !ct.starts_with("image/") => Err(format!(
                "file `{}` has unsupported content type `{}`",
                self.file_name, ct
            )),
            _ => Ok(()),
        }
    }
}
