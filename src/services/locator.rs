//! Locator classification and store key derivation.
//!
//! A locator is whatever string the database holds for an image. Every place
//! that needs to know what a locator points at goes through [`classify`] and
//! matches on [`LocatorKind`].

use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorKind {
    /// Fully-qualified `http(s)` URL.
    External(String),
    /// Path from the era when images lived on the web server's disk.
    LegacyLocal(String),
    /// Bare object store key.
    StoreKey(String),
}

pub fn classify(locator: &str) -> LocatorKind {
    let trimmed = locator.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        LocatorKind::External(trimmed.to_string())
    } else if trimmed.starts_with('/')
        || trimmed.starts_with("./")
        || trimmed.starts_with("uploads/")
        || trimmed.contains('\\')
    {
        LocatorKind::LegacyLocal(trimmed.to_string())
    } else {
        LocatorKind::StoreKey(trimmed.to_string())
    }
}

impl LocatorKind {
    /// The store key this locator addresses, if it is one of ours.
    ///
    /// External URLs must sit under `public_prefix`; the query string and
    /// fragment are ignored. Legacy paths never map to a key.
    pub fn store_key(&self, public_prefix: &str) -> Option<String> {
        match self {
            LocatorKind::External(url) => {
                let prefix = public_prefix.trim_end_matches('/');
                strip_query(url)
                    .strip_prefix(prefix)?
                    .strip_prefix('/')
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
            }
            LocatorKind::StoreKey(key) if !key.is_empty() => Some(key.clone()),
            LocatorKind::StoreKey(_) | LocatorKind::LegacyLocal(_) => None,
        }
    }

    /// Keys a sweep must not delete because of this locator.
    ///
    /// Besides the exact key, a locator whose path contains `/{folder}/` for a
    /// managed folder also protects the key starting at that folder. This
    /// covers URLs written under an older public host or bucket path.
    pub fn protected_keys(&self, public_prefix: &str, folders: &[&str]) -> Vec<String> {
        let mut keys: Vec<String> = self.store_key(public_prefix).into_iter().collect();
        let raw = match self {
            LocatorKind::External(s) | LocatorKind::LegacyLocal(s) => strip_query(s),
            LocatorKind::StoreKey(_) => return keys,
        };
        let normalized = raw.replace('\\', "/");
        for folder in folders {
            let marker = format!("/{}/", folder);
            if let Some(pos) = normalized.find(&marker) {
                let candidate = normalized[pos + 1..].to_string();
                if !keys.contains(&candidate) {
                    keys.push(candidate);
                }
            }
        }
        keys
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Build a fresh key `{folder}/{unix_millis}-{uuid}{.ext}`.
pub fn generate_key(folder: &str, file_name: &str) -> String {
    format!(
        "{}/{}-{}{}",
        folder,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension_of(file_name)
    )
}

/// Upload time embedded in a key produced by [`generate_key`].
pub fn key_timestamp(key: &str) -> Option<DateTime<Utc>> {
    let file = key.rsplit('/').next()?;
    let (millis, _) = file.split_once('-')?;
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
