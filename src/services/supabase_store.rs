//! src/services/supabase_store.rs
//!
//! SupabaseObjectStore talks to a Supabase-compatible storage REST API over
//! `reqwest`. Keys are bucket-relative; listings are paged and returned as
//! full keys.

use crate::services::object_store::{
    ObjectStore, StoreError, StoreResult, StoredObject, ensure_key_safe,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
    public_prefix: String,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// Folders come back with a null id.
    id: Option<String>,
}

impl SupabaseObjectStore {
    /// Build the client. `timeout` bounds every storage request.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = config.url.trim_end_matches('/').to_string();
        let public_prefix = format!(
            "{}/storage/v1/object/public/{}",
            base_url, config.bucket
        );
        Ok(Self {
            client,
            base_url,
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
            public_prefix,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    async fn list_page(&self, dir: &str, offset: usize) -> StoreResult<Vec<ListEntry>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({
                "prefix": dir,
                "limit": LIST_PAGE_SIZE,
                "offset": offset,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn non-2xx responses into `StoreError`, reading the body for context.
async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn is_duplicate(err: &StoreError) -> bool {
    match err {
        StoreError::Status { status, body } => {
            *status == StatusCode::CONFLICT.as_u16() || body.contains("Duplicate")
        }
        _ => false,
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<String> {
        ensure_key_safe(key)?;
        let size = bytes.len();
        let response = self
            .authorized(self.client.post(self.object_url(key)))
            .header(
                header::CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        match check_status(response).await {
            Ok(_) => {
                debug!(key, size, "uploaded object to storage provider");
                Ok(key.to_string())
            }
            Err(err) if is_duplicate(&err) => Err(StoreError::Conflict(key.to_string())),
            Err(err) => Err(err),
        }
    }

    async fn remove(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": keys }))
            .send()
            .await?;
        check_status(response).await?;
        debug!(count = keys.len(), "removed objects from storage provider");
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<StoredObject>> {
        // The provider lists one folder level, naming entries relative to it.
        let (dir, name_prefix) = match prefix.rfind('/') {
            Some(pos) => (&prefix[..pos], &prefix[pos + 1..]),
            None => ("", prefix),
        };
        let mut objects = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.list_page(dir, offset).await?;
            let page_len = page.len();
            for entry in page {
                if entry.id.is_none() || !entry.name.starts_with(name_prefix) {
                    continue;
                }
                let key = if dir.is_empty() {
                    entry.name
                } else {
                    format!("{}/{}", dir, entry.name)
                };
                objects.push(StoredObject { key });
                if objects.len() >= limit {
                    return Ok(objects);
                }
            }
            if page_len < LIST_PAGE_SIZE {
                return Ok(objects);
            }
            offset += page_len;
        }
    }

    fn public_prefix(&self) -> &str {
        &self.public_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, body_partial_json, header, method, path},
    };

    fn store_at(url: &str) -> SupabaseObjectStore {
        SupabaseObjectStore::new(
            &SupabaseConfig {
                url: url.into(),
                service_key: "service-key".into(),
                bucket: "site".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn store() -> SupabaseObjectStore {
        store_at("https://abc.supabase.co/")
    }

    fn file(name: &str) -> Value {
        json!({ "name": name, "id": format!("id-{}", name) })
    }

    fn folder(name: &str) -> Value {
        json!({ "name": name, "id": null })
    }

    #[test]
    fn public_urls_use_the_public_object_path() {
        assert_eq!(
            store().public_url("projects/1-a.png"),
            "https://abc.supabase.co/storage/v1/object/public/site/projects/1-a.png"
        );
        assert_eq!(
            store().object_url("projects/1-a.png"),
            "https://abc.supabase.co/storage/v1/object/site/projects/1-a.png"
        );
    }

    #[test]
    fn duplicate_responses_are_conflicts() {
        assert!(is_duplicate(&StoreError::Status {
            status: 409,
            body: String::new()
        }));
        assert!(is_duplicate(&StoreError::Status {
            status: 400,
            body: r#"{"statusCode":"409","error":"Duplicate"}"#.into()
        }));
        assert!(!is_duplicate(&StoreError::Status {
            status: 500,
            body: "boom".into()
        }));
    }

    #[tokio::test]
    async fn upload_refuses_to_overwrite() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/site/projects/1-a.png"))
            .and(header("x-upsert", "false"))
            .and(header("authorization", "Bearer service-key"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "site/projects/1-a.png" })))
            .expect(1)
            .mount(&server)
            .await;

        let key = store_at(&server.uri())
            .upload("projects/1-a.png", Bytes::from_static(b"png"), Some("image/png"))
            .await
            .unwrap();
        assert_eq!(key, "projects/1-a.png");
    }

    #[tokio::test]
    async fn upload_maps_duplicates_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/site/projects/1-dup.png"))
            .respond_with(ResponseTemplate::new(409).set_body_string("exists"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/site/projects/2-dup.png"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"statusCode":"409","error":"Duplicate"}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/site/projects/3-err.png"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = store_at(&server.uri());
        for key in ["projects/1-dup.png", "projects/2-dup.png"] {
            let err = store
                .upload(key, Bytes::from_static(b"png"), None)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Conflict(k) if k == key));
        }
        let err = store
            .upload("projects/3-err.png", Bytes::from_static(b"png"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn remove_sends_prefixes() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/site"))
            .and(body_json(json!({ "prefixes": ["projects/1-a.png", "team/2-b.png"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_at(&server.uri());
        store
            .remove(&["projects/1-a.png".to_string(), "team/2-b.png".to_string()])
            .await
            .unwrap();
        // Nothing to send for an empty batch.
        store.remove(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn list_pages_and_returns_full_keys() {
        let server = MockServer::start().await;
        let mut first: Vec<Value> = (0..99).map(|i| file(&format!("{:03}-a.png", i))).collect();
        first.insert(10, folder("nested"));
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/site"))
            .and(body_partial_json(json!({ "prefix": "projects", "offset": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(first)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/site"))
            .and(body_partial_json(json!({ "prefix": "projects", "offset": 100 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([file("100-b.png"), file("101-c.png")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let objects = store_at(&server.uri()).list("projects/", 1000).await.unwrap();

        assert_eq!(objects.len(), 101);
        assert_eq!(objects[0].key, "projects/000-a.png");
        assert_eq!(objects[100].key, "projects/101-c.png");
        assert!(objects.iter().all(|o| o.key != "projects/nested"));
    }

    #[tokio::test]
    async fn list_stops_at_limit() {
        let server = MockServer::start().await;
        let page: Vec<Value> = (0..100).map(|i| file(&format!("{:03}-a.png", i))).collect();
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/site"))
            .and(body_partial_json(json!({ "prefix": "team", "offset": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(page)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/site"))
            .and(body_partial_json(json!({ "offset": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let objects = store_at(&server.uri()).list("team/", 3).await.unwrap();

        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["team/000-a.png", "team/001-a.png", "team/002-a.png"]);
    }
}
