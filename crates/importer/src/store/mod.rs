// ABOUTME: ContentStore trait: the seam between the importer and the CMS holding imported content.
// ABOUTME: Implemented by PayloadStore (Payload REST API) and MemoryStore (dry runs and tests).

mod memory;
mod payload;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::ImportError;

pub use memory::{CallCounts, MemoryStore, StoredMedia};
pub use payload::PayloadStore;

/// Identifier of a document in the content store.
pub type DocId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Categories,
    Posts,
    Media,
}

impl Collection {
    /// Collection slug as used in API paths.
    pub fn slug(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Categories => "categories",
            Collection::Posts => "posts",
            Collection::Media => "media",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A downloaded file to be stored as a media document.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
    pub alt: String,
    pub caption: String,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Id of the first document whose `field` equals `value`.
    async fn find_by(&self, collection: Collection, field: &str, value: &str) -> Result<Option<DocId>, ImportError>;

    async fn create(&self, collection: Collection, data: Value) -> Result<DocId, ImportError>;

    async fn update(&self, collection: Collection, id: &str, data: Value) -> Result<DocId, ImportError>;

    async fn create_media(&self, upload: MediaUpload) -> Result<DocId, ImportError>;
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for &S {
    async fn find_by(&self, collection: Collection, field: &str, value: &str) -> Result<Option<DocId>, ImportError> {
        (**self).find_by(collection, field, value).await
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<DocId, ImportError> {
        (**self).create(collection, data).await
    }

    async fn update(&self, collection: Collection, id: &str, data: Value) -> Result<DocId, ImportError> {
        (**self).update(collection, id, data).await
    }

    async fn create_media(&self, upload: MediaUpload) -> Result<DocId, ImportError> {
        (**self).create_media(upload).await
    }
}

/// Reads a document id that may be a string or a number.
pub(crate) fn id_from_value(value: &Value) -> Option<DocId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// MIME type guessed from a file extension, for uploads without a usable content type.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_from_value(&json!(42)), Some("42".to_string()));
        assert_eq!(id_from_value(&json!("")), None);
        assert_eq!(id_from_value(&json!(null)), None);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("JPG"), "image/jpeg");
        assert_eq!(mime_for_extension("webp"), "image/webp");
        assert_eq!(mime_for_extension("bin"), "application/octet-stream");
    }
}
