// ABOUTME: Media materializer: downloads images once per URL and stores them as media documents.
// ABOUTME: Implements the richtext MediaResolver; failures are recorded and yield no media id.

use async_trait::async_trait;
use wp2payload_richtext::{guess_extension, MediaId, MediaResolver};

use crate::context::{FailureScope, ImportContext};
use crate::error::ImportError;
use crate::policy::Stage;
use crate::resource::{fetch, FetchOptions, FetchResult};
use crate::store::{mime_for_extension, ContentStore, MediaUpload};

/// Resolves image URLs to media ids for one post.
pub struct MediaMaterializer<'a, S: ContentStore + ?Sized> {
    http: &'a reqwest::Client,
    store: &'a S,
    ctx: &'a mut ImportContext,
    post: Option<String>,
}

impl<'a, S: ContentStore + ?Sized> MediaMaterializer<'a, S> {
    pub fn new(http: &'a reqwest::Client, store: &'a S, ctx: &'a mut ImportContext) -> Self {
        Self {
            http,
            store,
            ctx,
            post: None,
        }
    }

    /// Post reference written with every failure.
    pub fn for_post(mut self, post: impl Into<String>) -> Self {
        self.post = Some(post.into());
        self
    }

    /// Returns the media id for `url`, downloading and storing it on first sight.
    pub async fn materialize_url(&mut self, url: &str, alt: &str, caption: &str) -> Option<MediaId> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        if let Some(id) = self.ctx.media.get(url) {
            tracing::debug!(url, id, "media cache hit");
            return Some(id.to_string());
        }

        let download = fetch(self.http, url, &FetchOptions::default()).await;
        let download = self.settle(Stage::ImageDownload, "image download failed", url, download)?;

        let upload = upload_for(url, download, alt, caption);
        let created = self.store.create_media(upload).await;
        let id = self.settle(Stage::MediaCreate, "media create failed", url, created)?;

        if self.ctx.media.insert(url, id.clone()) {
            if let Err(err) = self.ctx.media.save() {
                tracing::warn!("media map not saved: {}", err);
            }
        }
        tracing::debug!(url, id = %id, "media created");
        Some(id)
    }

    fn settle<T>(&mut self, stage: Stage, message: &str, url: &str, result: Result<T, ImportError>) -> Option<T> {
        let scope = FailureScope {
            message,
            url: Some(url),
            post: self.post.as_deref(),
        };
        self.ctx.settle(stage, scope, result).value()
    }
}

fn upload_for(url: &str, download: FetchResult, alt: &str, caption: &str) -> MediaUpload {
    let ext = guess_extension(url);
    let mime_type = download
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| mime_for_extension(&ext))
        .to_string();

    MediaUpload {
        file_name: format!("{}.{}", uuid::Uuid::new_v4(), ext),
        mime_type,
        bytes: download.body,
        alt: alt.to_string(),
        caption: caption.to_string(),
    }
}

#[async_trait]
impl<S: ContentStore + ?Sized> MediaResolver for MediaMaterializer<'_, S> {
    async fn materialize(&mut self, url: &str, alt: &str, caption: &str) -> Option<MediaId> {
        self.materialize_url(url, alt, caption).await
    }
}
