// ABOUTME: In-process ContentStore keeping documents in memory and counting calls.
// ABOUTME: Backs --dry-run and the test suite; individual collections can be made to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{Collection, ContentStore, DocId, MediaUpload};
use crate::error::ImportError;

/// Number of calls made against a [`MemoryStore`], per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub finds: usize,
    pub creates: usize,
    pub updates: usize,
    pub media_creates: usize,
}

/// A media document kept by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub id: DocId,
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub alt: String,
    pub caption: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    docs: HashMap<Collection, Vec<(DocId, Value)>>,
    media: Vec<StoredMedia>,
    calls: CallCounts,
    failing: HashSet<Collection>,
}

impl State {
    fn next_id(&mut self) -> DocId {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn check(&self, collection: Collection, op: &str) -> Result<(), ImportError> {
        if self.failing.contains(&collection) {
            return Err(ImportError::store(
                collection.slug(),
                op,
                Some(anyhow::anyhow!("{} is configured to fail", collection)),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every call touching `collection` fail with a Store error.
    pub fn fail_collection(&self, collection: Collection) {
        self.state().failing.insert(collection);
    }

    /// Inserts a document directly, bypassing call counting.
    pub fn insert(&self, collection: Collection, data: Value) -> DocId {
        let mut state = self.state();
        let id = state.next_id();
        state.docs.entry(collection).or_default().push((id.clone(), data));
        id
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    pub fn documents(&self, collection: Collection) -> Vec<(DocId, Value)> {
        self.state().docs.get(&collection).cloned().unwrap_or_default()
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<Value> {
        self.state()
            .docs
            .get(&collection)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, data)| data.clone())
    }

    pub fn media(&self) -> Vec<StoredMedia> {
        self.state().media.clone()
    }
}

fn field_matches(data: &Value, field: &str, value: &str) -> bool {
    match data.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        _ => false,
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_by(&self, collection: Collection, field: &str, value: &str) -> Result<Option<DocId>, ImportError> {
        let mut state = self.state();
        state.calls.finds += 1;
        state.check(collection, "Find")?;

        Ok(state.docs.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|(_, data)| field_matches(data, field, value))
                .map(|(id, _)| id.clone())
        }))
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<DocId, ImportError> {
        let mut state = self.state();
        state.calls.creates += 1;
        state.check(collection, "Create")?;

        let id = state.next_id();
        state.docs.entry(collection).or_default().push((id.clone(), data));
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, data: Value) -> Result<DocId, ImportError> {
        let mut state = self.state();
        state.calls.updates += 1;
        state.check(collection, "Update")?;

        let doc = state
            .docs
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| doc_id == id))
            .ok_or_else(|| ImportError::not_found(collection.slug(), "Update", Some(anyhow::anyhow!("no document {}", id))))?;

        if let (Value::Object(existing), Value::Object(changes)) = (&mut doc.1, data) {
            existing.extend(changes);
        }
        Ok(id.to_string())
    }

    async fn create_media(&self, upload: MediaUpload) -> Result<DocId, ImportError> {
        let mut state = self.state();
        state.calls.media_creates += 1;
        state.check(Collection::Media, "CreateMedia")?;

        let id = state.next_id();
        state.media.push(StoredMedia {
            id: id.clone(),
            file_name: upload.file_name,
            mime_type: upload.mime_type,
            size: upload.bytes.len(),
            alt: upload.alt,
            caption: upload.caption,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_find_update() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Categories, json!({"slug": "news", "title": "News"}))
            .await
            .unwrap();

        let found = store.find_by(Collection::Categories, "slug", "news").await.unwrap();
        assert_eq!(found, Some(id.clone()));
        assert_eq!(store.find_by(Collection::Categories, "slug", "other").await.unwrap(), None);

        store
            .update(Collection::Categories, &id, json!({"title": "Latest"}))
            .await
            .unwrap();
        let doc = store.get(Collection::Categories, &id).unwrap();
        assert_eq!(doc["title"], "Latest");
        assert_eq!(doc["slug"], "news");

        assert_eq!(
            store.calls(),
            CallCounts {
                finds: 2,
                creates: 1,
                updates: 1,
                media_creates: 0
            }
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryStore::new();
        let err = store.update(Collection::Posts, "99", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failing_collection() {
        let store = MemoryStore::new();
        store.fail_collection(Collection::Media);
        let err = store
            .create_media(MediaUpload {
                file_name: "a.jpg".into(),
                mime_type: "image/jpeg".into(),
                bytes: Bytes::from_static(b"x"),
                alt: String::new(),
                caption: String::new(),
            })
            .await
            .unwrap_err();
        assert!(err.is_store());
        assert_eq!(store.calls().media_creates, 1);
        assert!(store.media().is_empty());
    }
}
