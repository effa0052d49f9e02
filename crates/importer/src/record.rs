// ABOUTME: Post import record: the Payload document assembled from one WordPress post.
// ABOUTME: Derives title, excerpt, SEO meta and publish date, and serializes the save payload.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use wp2payload_richtext::{clamp_text, strip_html, MediaId, Root};

use crate::store::DocId;
use crate::upsert::DEFAULT_DESCRIPTION;
use crate::wordpress::WpPost;

pub const META_TITLE_MAX: usize = 60;
pub const META_DESCRIPTION_MAX: usize = 160;

#[derive(Debug, Clone)]
pub struct PostRecord {
    pub wp_id: u64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub meta_title: String,
    pub meta_description: String,
    pub published_date: Option<String>,
    pub author: Option<DocId>,
    pub categories: Vec<DocId>,
    pub image: Option<MediaId>,
    pub content: Root,
}

impl PostRecord {
    /// Derives the text fields from `post`; relations start empty.
    pub fn new(post: &WpPost, content: Root) -> Self {
        let stripped_title = strip_html(&post.title.rendered);
        let title = if stripped_title.is_empty() {
            format!("Post {}", post.id)
        } else {
            stripped_title
        };

        let stripped_excerpt = strip_html(&post.excerpt.rendered);
        let excerpt = if stripped_excerpt.is_empty() {
            title.clone()
        } else {
            stripped_excerpt.clone()
        };

        let meta_description = [stripped_excerpt, strip_html(&post.content.rendered)]
            .iter()
            .map(|text| clamp_text(text, META_DESCRIPTION_MAX))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Self {
            wp_id: post.id,
            slug: post.slug.clone(),
            meta_title: clamp_text(&title, META_TITLE_MAX),
            title,
            excerpt,
            meta_description,
            published_date: published_date(post),
            author: None,
            categories: Vec::new(),
            image: None,
            content,
        }
    }

    /// Body sent to the posts collection. Absent relations are left out.
    pub fn to_data(&self) -> Value {
        let mut data = Map::new();
        data.insert("slug".into(), json!(self.slug));
        data.insert("title".into(), json!(self.title));
        data.insert("excerpt".into(), json!(self.excerpt));
        data.insert("category".into(), json!(self.categories));
        if let Some(image) = &self.image {
            data.insert("image".into(), json!(image));
        }
        if let Some(date) = &self.published_date {
            data.insert("publishedDate".into(), json!(date));
        }
        data.insert("content".into(), self.content.to_lexical());
        data.insert(
            "meta".into(),
            json!({ "title": self.meta_title, "description": self.meta_description }),
        );
        if let Some(author) = &self.author {
            data.insert("author".into(), json!(author));
        }
        Value::Object(data)
    }
}

/// Publish date as RFC 3339 UTC, from `date_gmt` or else the site-local `date`.
/// Unparseable dates are dropped rather than sent.
fn published_date(post: &WpPost) -> Option<String> {
    let candidates = [post.date_gmt.as_deref(), Some(post.date.as_str())];
    candidates.into_iter().flatten().map(str::trim).find_map(|raw| {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true))
    })
}
