// ABOUTME: WordPress REST API client and the post, user, category and media payload types.
// ABOUTME: Handles paginated post listing, authenticated author lookup and featured media resolution.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ImportError;
use crate::options::Auth;
use crate::resource::{fetch, FetchOptions, FetchResult};

/// WordPress error code for a page past the end of the collection.
const INVALID_PAGE_CODE: &str = "rest_post_invalid_page_number";

/// Sizes tried, in order, when a media object has no top-level `source_url`.
const MEDIA_SIZE_PREFERENCE: &[&str] = &["full", "large", "medium_large"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<Value>,
}

impl WpPost {
    /// Featured media embedded by `_embed`, when present and usable.
    pub fn embedded_featured_media(&self) -> Option<WpMedia> {
        let media = self.embedded.as_ref()?.get("wp:featuredmedia")?.get(0)?;
        serde_json::from_value(media.clone()).ok()
    }

    /// Short reference used in logs: `<id> <slug>`.
    pub fn reference(&self) -> String {
        format!("{} {}", self.id, self.slug)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Only present for `context=edit` reads with sufficient permissions.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpCategory {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaSize {
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaDetails {
    #[serde(default)]
    pub sizes: HashMap<String, MediaSize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpMedia {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub caption: Rendered,
    #[serde(default)]
    pub media_details: Option<MediaDetails>,
    #[serde(default)]
    pub guid: Option<Rendered>,
}

impl WpMedia {
    /// Download URL: `source_url`, then the full/large/medium_large sizes, then the guid.
    pub fn best_url(&self) -> Option<String> {
        let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        non_empty(&self.source_url)
            .or_else(|| {
                let sizes = &self.media_details.as_ref()?.sizes;
                MEDIA_SIZE_PREFERENCE
                    .iter()
                    .find_map(|size| non_empty(&sizes.get(*size)?.source_url))
            })
            .or_else(|| {
                let guid = self.guid.as_ref()?.rendered.trim();
                (!guid.is_empty()).then(|| guid.to_string())
            })
    }
}

/// One page of the post listing.
#[derive(Debug, Clone)]
pub enum PostsPage {
    Posts {
        posts: Vec<WpPost>,
        total_pages: Option<u32>,
    },
    /// The requested page is past the end of the collection.
    OutOfRange,
}

/// Client for `{base}/wp-json/wp/v2`.
#[derive(Debug, Clone)]
pub struct WpClient {
    http: reqwest::Client,
    api: Url,
    auth: Option<Auth>,
}

impl WpClient {
    pub fn new(http: reqwest::Client, base: &str, auth: Option<Auth>) -> Result<Self, ImportError> {
        let root = format!("{}/wp-json/wp/v2/", base.trim().trim_end_matches('/'));
        let api = Url::parse(&root).map_err(|e| {
            ImportError::invalid_url(base, "WpClient", Some(anyhow::anyhow!("invalid base URL: {}", e)))
        })?;
        Ok(Self { http, api, auth })
    }

    pub fn api_url(&self) -> &Url {
        &self.api
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ImportError> {
        let mut url = self.api.join(path).map_err(|e| {
            ImportError::invalid_url(path, "WpClient", Some(anyhow::anyhow!("{}", e)))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get(&self, url: &Url, authed: bool, parse_non_200: bool) -> Result<FetchResult, ImportError> {
        let opts = FetchOptions {
            auth: if authed { self.auth.clone() } else { None },
            parse_non_200,
        };
        fetch(&self.http, url.as_str(), &opts).await
    }

    /// Fetches one page of posts with embedded relations.
    ///
    /// Statuses other than `publish` need credentials, which are sent when configured.
    pub async fn posts_page(&self, page: u32, per_page: u32, status: &str) -> Result<PostsPage, ImportError> {
        let url = self.endpoint(
            "posts",
            &[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("status", status.to_string()),
                ("_embed", "1".to_string()),
            ],
        )?;
        let result = self.get(&url, status != "publish", true).await?;

        if result.status == 400 && is_invalid_page(&result) {
            return Ok(PostsPage::OutOfRange);
        }
        if !result.is_success() {
            return Err(ImportError::status(
                url.as_str(),
                "Posts",
                result.status,
                Some(anyhow::anyhow!("HTTP status {}", result.status)),
            ));
        }

        let total_pages = result
            .header("x-wp-totalpages")
            .and_then(|v| v.trim().parse::<u32>().ok());
        let posts = result.json()?;
        Ok(PostsPage::Posts { posts, total_pages })
    }

    pub async fn user(&self, id: u64) -> Result<WpUser, ImportError> {
        let url = self.endpoint(&format!("users/{}", id), &[])?;
        self.get(&url, false, false).await?.json()
    }

    /// Reads a user with `context=edit` to get the real email, falling back
    /// to the public profile when that read is not permitted.
    pub async fn user_with_email(&self, id: u64) -> Result<WpUser, ImportError> {
        if self.auth.is_some() {
            let url = self.endpoint(&format!("users/{}", id), &[("context", "edit".to_string())])?;
            match self.get(&url, true, false).await.and_then(|r| r.json::<WpUser>()) {
                Ok(user) => return Ok(user),
                Err(err) => tracing::debug!(user = id, "context=edit read failed, using public profile: {}", err),
            }
        }
        self.user(id).await
    }

    pub async fn category(&self, id: u64) -> Result<WpCategory, ImportError> {
        let url = self.endpoint(&format!("categories/{}", id), &[])?;
        self.get(&url, false, false).await?.json()
    }

    pub async fn media(&self, id: u64) -> Result<WpMedia, ImportError> {
        let url = self.endpoint(&format!("media/{}", id), &[])?;
        self.get(&url, false, false).await?.json()
    }
}

fn is_invalid_page(result: &FetchResult) -> bool {
    serde_json::from_slice::<Value>(&result.body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_str).map(|c| c == INVALID_PAGE_CODE))
        .unwrap_or(false)
}
