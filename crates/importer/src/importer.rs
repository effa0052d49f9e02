// ABOUTME: Run controller: pages through WordPress posts and imports each one into the content store.
// ABOUTME: Resolves author, categories, featured image and content per post, then upserts the record.

use std::path::PathBuf;

use wp2payload_richtext::{strip_html, Converter, MediaId, Root};

use crate::context::{FailureScope, ImportContext, Settled};
use crate::error::ImportError;
use crate::failure_log::{FailureEntry, FailureKind, FailureLog};
use crate::media::MediaMaterializer;
use crate::options::ImportOptions;
use crate::policy::Stage;
use crate::record::PostRecord;
use crate::store::{ContentStore, DocId};
use crate::upsert::{upsert_category, upsert_post, upsert_user};
use crate::wordpress::{PostsPage, WpClient, WpPost};

/// Totals reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Posts fetched from WordPress.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Entries written to the failure log, including recovered ones.
    pub failures_logged: usize,
    pub log_path: PathBuf,
}

/// Imports WordPress posts into a [`ContentStore`].
pub struct Importer<S> {
    opts: ImportOptions,
    http: reqwest::Client,
    wp: WpClient,
    store: S,
}

impl<S: ContentStore> Importer<S> {
    /// Setup failures are written to the failure log as `FATAL` before returning.
    pub fn new(opts: ImportOptions, store: S) -> Result<Self, ImportError> {
        let (http, wp) = opts
            .http_client()
            .and_then(|http| {
                let wp = WpClient::new(http.clone(), &opts.wp_base, opts.auth.clone())?;
                Ok((http, wp))
            })
            .map_err(|err| record_fatal(&opts, "importer setup failed", err))?;
        Ok(Self {
            opts,
            http,
            wp,
            store,
        })
    }

    pub fn options(&self) -> &ImportOptions {
        &self.opts
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one import. Only a failure to read the first page of posts, or
    /// to open the work directory, ends the run with an error; everything
    /// else is recorded in the failure log and counted in the summary.
    pub async fn run(&self) -> Result<RunSummary, ImportError> {
        let mut ctx = ImportContext::open(&self.opts)
            .map_err(|err| record_fatal(&self.opts, "work directory or id maps unavailable", err))?;

        let posts = self.fetch_posts(&mut ctx).await?;
        let total = posts.len();
        tracing::info!("fetched {} posts from {}", total, self.wp.api_url());

        let mut succeeded = 0;
        for (index, post) in posts.iter().enumerate() {
            tracing::info!("[{}/{}] importing {}", index + 1, total, post.reference());
            if self.import_post(&mut ctx, post).await {
                succeeded += 1;
            }
        }

        let summary = RunSummary {
            total,
            succeeded,
            failed: total - succeeded,
            failures_logged: ctx.failures.count(),
            log_path: ctx.failures.path().to_path_buf(),
        };
        tracing::info!(
            "import finished: {} ok, {} failed, {} logged failures",
            summary.succeeded,
            summary.failed,
            summary.failures_logged
        );
        Ok(summary)
    }

    /// Pages through the post listing until it runs out or the limit is hit.
    async fn fetch_posts(&self, ctx: &mut ImportContext) -> Result<Vec<WpPost>, ImportError> {
        let mut posts = Vec::new();
        let mut page = 1;

        loop {
            let stage = if page == 1 {
                Stage::FirstPostsPage
            } else {
                Stage::PostsPage
            };
            let url = format!("{}posts?page={}", self.wp.api_url(), page);
            let result = self
                .wp
                .posts_page(page, self.opts.per_page, &self.opts.status)
                .await;
            let scope = FailureScope {
                message: "posts page fetch failed",
                url: Some(&url),
                post: None,
            };

            let (batch, total_pages) = match ctx.settle(stage, scope, result) {
                Settled::Value(PostsPage::Posts { posts, total_pages }) => (posts, total_pages),
                Settled::Value(PostsPage::OutOfRange) => break,
                Settled::Fatal(err) => return Err(err),
                Settled::Omitted | Settled::Failed(_) => {
                    tracing::warn!("pagination stopped at page {}; importing {} posts", page, posts.len());
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            tracing::debug!(page, count = batch.len(), "posts page");
            posts.extend(batch);

            if let Some(limit) = self.opts.limit {
                if posts.len() >= limit {
                    posts.truncate(limit);
                    break;
                }
            }
            if total_pages.is_some_and(|total| page >= total) {
                break;
            }
            page += 1;
        }

        Ok(posts)
    }

    /// Imports one post. Returns whether it was saved.
    async fn import_post(&self, ctx: &mut ImportContext, post: &WpPost) -> bool {
        let reference = post.reference();

        let author = self.resolve_author(ctx, post, &reference).await;
        let categories = self.resolve_categories(ctx, post, &reference).await;
        let image = self.featured_image(ctx, post, &reference).await;
        let content = self.convert_content(ctx, post, &reference).await;

        let mut record = PostRecord::new(post, content);
        record.author = author;
        record.categories = categories;
        record.image = image;

        let saved = upsert_post(&self.store, ctx, post.id, &post.slug, record.to_data()).await;
        let scope = FailureScope {
            message: "post save failed",
            url: Some(&post.link),
            post: Some(&reference),
        };
        match ctx.settle(Stage::PostSave, scope, saved) {
            Settled::Value((id, outcome)) => {
                tracing::info!("{} {} -> {}", outcome.as_str(), reference, id);
                true
            }
            _ => false,
        }
    }

    async fn resolve_author(&self, ctx: &mut ImportContext, post: &WpPost, reference: &str) -> Option<DocId> {
        if post.author == 0 {
            return None;
        }
        if let Some(id) = ctx.users.get(&post.author) {
            return Some(id.clone());
        }

        let result = match self.wp.user_with_email(post.author).await {
            Ok(user) => upsert_user(&self.store, ctx, &user).await,
            Err(err) => Err(err),
        };
        let url = format!("{}users/{}", self.wp.api_url(), post.author);
        let scope = FailureScope {
            message: "author import failed",
            url: Some(&url),
            post: Some(reference),
        };
        ctx.settle(Stage::Author, scope, result).value()
    }

    async fn resolve_categories(&self, ctx: &mut ImportContext, post: &WpPost, reference: &str) -> Vec<DocId> {
        let mut ids: Vec<DocId> = Vec::new();
        for &category_id in &post.categories {
            let result = match self.wp.category(category_id).await {
                Ok(category) => upsert_category(&self.store, ctx, &category).await,
                Err(err) => Err(err),
            };
            let url = format!("{}categories/{}", self.wp.api_url(), category_id);
            let scope = FailureScope {
                message: "category import failed",
                url: Some(&url),
                post: Some(reference),
            };
            if let Some(id) = ctx.settle(Stage::Category, scope, result).value() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Embedded `wp:featuredmedia` when it carries a URL, else `GET media/<id>`.
    async fn featured_image(&self, ctx: &mut ImportContext, post: &WpPost, reference: &str) -> Option<MediaId> {
        let embedded = post.embedded_featured_media().filter(|m| m.best_url().is_some());
        let media = match embedded {
            Some(media) => media,
            None if post.featured_media != 0 => {
                let result = self.wp.media(post.featured_media).await;
                let url = format!("{}media/{}", self.wp.api_url(), post.featured_media);
                let scope = FailureScope {
                    message: "featured media lookup failed",
                    url: Some(&url),
                    post: Some(reference),
                };
                ctx.settle(Stage::FeaturedMedia, scope, result).value()?
            }
            None => return None,
        };

        let Some(url) = media.best_url() else {
            tracing::debug!(post = reference, media = media.id, "featured media has no URL");
            return None;
        };
        let caption = strip_html(&media.caption.rendered);
        MediaMaterializer::new(&self.http, &self.store, ctx)
            .for_post(reference)
            .materialize_url(&url, &media.alt_text, &caption)
            .await
    }

    /// Converts the post body; a conversion failure leaves a plain-text paragraph.
    async fn convert_content(&self, ctx: &mut ImportContext, post: &WpPost, reference: &str) -> Root {
        let html = &post.content.rendered;
        let converter = match Converter::new().with_base_url(&post.link) {
            Ok(converter) => converter,
            Err(err) => {
                if !post.link.is_empty() {
                    tracing::debug!(post = reference, "ignoring post link as base URL: {}", err);
                }
                Converter::new()
            }
        };

        let mut media = MediaMaterializer::new(&self.http, &self.store, ctx).for_post(reference);
        let result = converter.build(html, &mut media).await.map_err(ImportError::from);

        let scope = FailureScope {
            message: "content conversion failed",
            url: Some(&post.link),
            post: Some(reference),
        };
        ctx.settle(Stage::Content, scope, result)
            .value()
            .unwrap_or_else(|| Root::fallback(&strip_html(html)))
    }
}

/// Logs an error raised before a run context exists and hands it back.
fn record_fatal(opts: &ImportOptions, message: &str, err: ImportError) -> ImportError {
    let mut entry = FailureEntry::from_error(FailureKind::Fatal, message, &err);
    if !opts.wp_base.trim().is_empty() {
        entry = entry.url(opts.wp_base.trim());
    }
    FailureLog::new(opts.log_path()).record(&entry);
    err
}
