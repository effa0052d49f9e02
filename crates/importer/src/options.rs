// ABOUTME: Configuration for an import run: ImportOptions, WordPress Auth, and the fluent ImporterBuilder.
// ABOUTME: Defaults mirror the command line: .tmp-wp-import work dir, 10 posts per page, 30s timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ImportError;
use crate::importer::Importer;
use crate::store::ContentStore;

pub const DEFAULT_WORK_DIR: &str = ".tmp-wp-import";
pub const DEFAULT_POST_MAP_FILE: &str = "wp-post-map.json";
pub const DEFAULT_MEDIA_MAP_FILE: &str = "wp-media-map.json";
pub const DEFAULT_LOG_FILE: &str = "import-errors.log";

/// WordPress REST API exposes at most this many items per page.
pub const MAX_PER_PAGE: u32 = 100;

/// Credentials for privileged WordPress reads, such as author emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl Auth {
    /// Picks the bearer token when present, else the username/password pair.
    /// Blank values count as absent.
    pub fn from_parts(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Option<Auth> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(token) = present(token) {
            return Some(Auth::Bearer(token));
        }
        match (present(username), present(password)) {
            (Some(username), Some(password)) => Some(Auth::Basic { username, password }),
            _ => None,
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

/// Configuration options for an import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// WordPress site root, e.g. `https://blog.example.com`.
    pub wp_base: String,
    pub auth: Option<Auth>,
    pub per_page: u32,
    /// Stop after this many posts.
    pub limit: Option<usize>,
    /// WordPress post status filter.
    pub status: String,
    pub work_dir: PathBuf,
    pub post_map_file: String,
    /// Persisted image URL to media id map; `None` keeps the cache in memory only.
    pub media_map_file: Option<String>,
    /// Read and write the id maps in the work directory. When off, both maps
    /// live in memory and the files are never touched (dry runs).
    pub persist_maps: bool,
    pub log_file: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<reqwest::Client>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            wp_base: String::new(),
            auth: None,
            per_page: 10,
            limit: None,
            status: "publish".to_string(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            post_map_file: DEFAULT_POST_MAP_FILE.to_string(),
            media_map_file: Some(DEFAULT_MEDIA_MAP_FILE.to_string()),
            persist_maps: true,
            log_file: DEFAULT_LOG_FILE.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("wp2payload/", env!("CARGO_PKG_VERSION")).to_string(),
            http_client: None,
        }
    }
}

impl ImportOptions {
    pub fn post_map_path(&self) -> PathBuf {
        self.work_dir.join(&self.post_map_file)
    }

    pub fn media_map_path(&self) -> Option<PathBuf> {
        self.media_map_file.as_ref().map(|f| self.work_dir.join(f))
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(&self.log_file)
    }

    /// HTTP client for WordPress and image downloads.
    pub fn http_client(&self) -> Result<reqwest::Client, ImportError> {
        if let Some(client) = &self.http_client {
            return Ok(client.clone());
        }
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| {
                ImportError::fetch(
                    "http client",
                    "Build",
                    Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
                )
            })
    }
}

/// Builder for constructing Importer instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ImporterBuilder {
    opts: ImportOptions,
}

impl ImporterBuilder {
    /// Create a new ImporterBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: ImportOptions::default(),
        }
    }

    /// Set the WordPress site root.
    pub fn wp_base(mut self, base: impl Into<String>) -> Self {
        self.opts.wp_base = base.into();
        self
    }

    pub fn auth(mut self, auth: Option<Auth>) -> Self {
        self.opts.auth = auth;
        self
    }

    /// Set the page size, clamped to 1..=100.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.opts.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.opts.limit = limit;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.opts.status = status.into();
        self
    }

    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.opts.work_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn post_map_file(mut self, file: impl Into<String>) -> Self {
        self.opts.post_map_file = file.into();
        self
    }

    /// Set or disable the persisted media map.
    pub fn media_map_file(mut self, file: Option<String>) -> Self {
        self.opts.media_map_file = file;
        self
    }

    /// Keep both id maps in memory when `false`.
    pub fn persist_maps(mut self, persist: bool) -> Self {
        self.opts.persist_maps = persist;
        self
    }

    pub fn log_file(mut self, file: impl Into<String>) -> Self {
        self.opts.log_file = file.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.opts
    }

    /// Build the Importer writing to `store`.
    pub fn build<S: ContentStore>(self, store: S) -> Result<Importer<S>, ImportError> {
        Importer::new(self.opts, store)
    }
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ImportOptions::default();
        assert_eq!(opts.per_page, 10);
        assert_eq!(opts.status, "publish");
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert_eq!(
            opts.post_map_path(),
            PathBuf::from(".tmp-wp-import/wp-post-map.json")
        );
        assert_eq!(
            opts.log_path(),
            PathBuf::from(".tmp-wp-import/import-errors.log")
        );
        assert_eq!(
            opts.media_map_path(),
            Some(PathBuf::from(".tmp-wp-import/wp-media-map.json"))
        );
    }

    #[test]
    fn test_builder_clamps_per_page() {
        assert_eq!(ImporterBuilder::new().per_page(0).options().per_page, 1);
        assert_eq!(ImporterBuilder::new().per_page(500).options().per_page, 100);
    }

    #[test]
    fn test_media_map_can_be_disabled() {
        let builder = ImporterBuilder::new().media_map_file(None);
        assert_eq!(builder.options().media_map_path(), None);
    }

    #[test]
    fn test_maps_persist_unless_disabled() {
        assert!(ImportOptions::default().persist_maps);
        assert!(!ImporterBuilder::new().persist_maps(false).options().persist_maps);
    }

    #[test]
    fn test_auth_bearer_wins() {
        let auth = Auth::from_parts(
            Some("tok".into()),
            Some("user".into()),
            Some("pass".into()),
        );
        assert_eq!(auth, Some(Auth::Bearer("tok".into())));
    }

    #[test]
    fn test_auth_basic_needs_both_parts() {
        assert_eq!(
            Auth::from_parts(None, Some("user".into()), Some("pass".into())),
            Some(Auth::Basic {
                username: "user".into(),
                password: "pass".into()
            })
        );
        assert_eq!(Auth::from_parts(None, Some("user".into()), None), None);
        assert_eq!(Auth::from_parts(Some("  ".into()), None, None), None);
    }
}
