// ABOUTME: HTTP fetching for WordPress API calls and image downloads.
// ABOUTME: Validates URLs, applies optional auth, enforces a size limit and maps failures to ImportError.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::ImportError;
use crate::options::Auth;

/// Maximum allowed response size (25 MB); large enough for full-size images.
pub const MAX_CONTENT_LENGTH: usize = 25 * 1024 * 1024;

/// Options for fetching a resource.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub auth: Option<Auth>,
    /// Return non-2xx responses instead of failing with a Status error.
    pub parse_non_200: bool,
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ImportError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ImportError::decode(
                &self.url,
                "Decode",
                Some(anyhow::anyhow!("invalid JSON: {}", e)),
            )
        })
    }
}

/// Fetch a resource from the given URL, following redirects.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, ImportError> {
    if url.is_empty() {
        return Err(ImportError::invalid_url(url, "Fetch", None));
    }

    let parsed_url = url::Url::parse(url).map_err(|e| {
        ImportError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ImportError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let mut request = client.get(parsed_url);
    if let Some(auth) = &opts.auth {
        request = auth.apply(request);
    }

    let response = request.send().await.map_err(|e| {
        ImportError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
    })?;

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ImportError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers = response.headers().clone();
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().await.map_err(|e| {
        ImportError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ImportError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    let result = FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        headers,
        body,
    };

    if !result.is_success() && !opts.parse_non_200 {
        return Err(ImportError::status(
            url,
            "Fetch",
            status,
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    Ok(result)
}
