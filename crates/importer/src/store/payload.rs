// ABOUTME: ContentStore backed by the Payload CMS REST API.
// ABOUTME: Uses where-equals queries for lookups, JSON POST/PATCH for documents and multipart uploads for media.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use url::Url;

use super::{id_from_value, Collection, ContentStore, DocId, MediaUpload};
use crate::error::ImportError;

/// Payload REST client rooted at `{base}/api/`.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    http: reqwest::Client,
    api: Url,
    api_key: Option<String>,
}

impl PayloadStore {
    /// `api_key` is sent as `Authorization: users API-Key <key>`.
    pub fn new(http: reqwest::Client, base: &str, api_key: Option<String>) -> Result<Self, ImportError> {
        let root = format!("{}/api/", base.trim().trim_end_matches('/'));
        let api = Url::parse(&root).map_err(|e| {
            ImportError::invalid_url(base, "PayloadStore", Some(anyhow::anyhow!("invalid base URL: {}", e)))
        })?;
        Ok(Self {
            http,
            api,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ImportError> {
        self.api
            .join(path)
            .map_err(|e| ImportError::invalid_url(path, "PayloadStore", Some(anyhow::anyhow!("{}", e))))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, format!("users API-Key {}", key)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, target: &str, op: &str) -> Result<Value, ImportError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            ImportError::store(target, op, Some(anyhow::anyhow!("request failed: {}", e)))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            ImportError::store(target, op, Some(anyhow::anyhow!("failed to read body: {}", e)))
        })?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body);
            return Err(ImportError::store(
                target,
                op,
                Some(anyhow::anyhow!("HTTP status {}: {}", status.as_u16(), message.trim())),
            ));
        }

        serde_json::from_slice(&body).map_err(|e| {
            ImportError::store(target, op, Some(anyhow::anyhow!("invalid JSON response: {}", e)))
        })
    }
}

/// Id of the document in a create/update response (`{"doc": {...}}`) or a bare document.
fn doc_id(response: &Value) -> Option<DocId> {
    response
        .get("doc")
        .and_then(|doc| doc.get("id"))
        .or_else(|| response.get("id"))
        .and_then(id_from_value)
}

fn missing_id(target: &str, op: &str) -> ImportError {
    ImportError::store(target, op, Some(anyhow::anyhow!("response carries no document id")))
}

#[async_trait]
impl ContentStore for PayloadStore {
    async fn find_by(&self, collection: Collection, field: &str, value: &str) -> Result<Option<DocId>, ImportError> {
        let mut url = self.endpoint(collection.slug())?;
        url.query_pairs_mut()
            .append_pair(&format!("where[{}][equals]", field), value)
            .append_pair("limit", "1")
            .append_pair("depth", "0");

        let response = self.send(self.http.get(url), collection.slug(), "Find").await?;
        Ok(response
            .get("docs")
            .and_then(|docs| docs.get(0))
            .and_then(|doc| doc.get("id"))
            .and_then(id_from_value))
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<DocId, ImportError> {
        let url = self.endpoint(collection.slug())?;
        let response = self
            .send(self.http.post(url).json(&data), collection.slug(), "Create")
            .await?;
        doc_id(&response).ok_or_else(|| missing_id(collection.slug(), "Create"))
    }

    async fn update(&self, collection: Collection, id: &str, data: Value) -> Result<DocId, ImportError> {
        let url = self.endpoint(&format!("{}/{}", collection.slug(), id))?;
        let response = self
            .send(self.http.patch(url).json(&data), collection.slug(), "Update")
            .await?;
        Ok(doc_id(&response).unwrap_or_else(|| id.to_string()))
    }

    async fn create_media(&self, upload: MediaUpload) -> Result<DocId, ImportError> {
        let target = Collection::Media.slug();
        let url = self.endpoint(target)?;

        let file = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| ImportError::store(target, "CreateMedia", Some(anyhow::anyhow!("invalid MIME type: {}", e))))?;
        let fields = json!({ "alt": upload.alt, "caption": upload.caption });
        let form = Form::new()
            .part("file", file)
            .text("_payload", fields.to_string());

        let response = self
            .send(self.http.post(url).multipart(form), target, "CreateMedia")
            .await?;
        doc_id(&response).ok_or_else(|| missing_id(target, "CreateMedia"))
    }
}
