// ABOUTME: Idempotent upserts of authors, categories and posts into the content store.
// ABOUTME: Looks up by natural key, updates or creates, and caches resolved ids for the run.

use serde_json::{json, Value};

use crate::context::ImportContext;
use crate::error::ImportError;
use crate::store::{Collection, ContentStore, DocId};
use crate::wordpress::{WpCategory, WpUser};

/// Role given to every imported author.
pub const AUTHOR_ROLE: &str = "Author";

/// Description used when a category has none.
pub const DEFAULT_DESCRIPTION: &str = "Importado do WordPress";

/// Whether an upsert created a new document or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Email used as the author's natural key. WordPress only exposes real
/// addresses to authenticated `context=edit` reads.
pub fn author_email(user: &WpUser) -> String {
    user.email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("wp-{}@import.local", user.id))
}

pub fn author_name(user: &WpUser) -> String {
    [user.name.trim(), user.slug.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("WP User {}", user.id))
}

/// Random 64 hex character password; imported authors log in only after a reset.
fn random_password() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Finds the author by email and updates it, or creates it.
pub async fn upsert_user<S>(store: &S, ctx: &mut ImportContext, user: &WpUser) -> Result<DocId, ImportError>
where
    S: ContentStore + ?Sized,
{
    if let Some(id) = ctx.users.get(&user.id) {
        return Ok(id.clone());
    }

    let email = author_email(user);
    let name = author_name(user);
    let bio = user.description.trim();

    let id = match store.find_by(Collection::Users, "email", &email).await? {
        Some(existing) => {
            store
                .update(
                    Collection::Users,
                    &existing,
                    json!({ "name": name, "role": AUTHOR_ROLE, "bio": bio }),
                )
                .await?
        }
        None => {
            store
                .create(
                    Collection::Users,
                    json!({
                        "email": email,
                        "password": random_password(),
                        "name": name,
                        "role": AUTHOR_ROLE,
                        "bio": bio,
                    }),
                )
                .await?
        }
    };

    tracing::debug!(wp_id = user.id, id = %id, "author resolved");
    ctx.users.insert(user.id, id.clone());
    Ok(id)
}

/// Finds the category by slug and updates it, or creates it.
pub async fn upsert_category<S>(store: &S, ctx: &mut ImportContext, category: &WpCategory) -> Result<DocId, ImportError>
where
    S: ContentStore + ?Sized,
{
    if let Some(id) = ctx.categories.get(&category.slug) {
        return Ok(id.clone());
    }

    let description = match category.description.trim() {
        "" => DEFAULT_DESCRIPTION,
        d => d,
    };

    let id = match store.find_by(Collection::Categories, "slug", &category.slug).await? {
        Some(existing) => {
            store
                .update(
                    Collection::Categories,
                    &existing,
                    json!({ "title": category.name, "description": description }),
                )
                .await?
        }
        None => {
            store
                .create(
                    Collection::Categories,
                    json!({
                        "title": category.name,
                        "slug": category.slug,
                        "description": description,
                    }),
                )
                .await?
        }
    };

    ctx.categories.insert(category.slug.clone(), id.clone());
    Ok(id)
}

/// Saves a post: the mapped id wins over a slug lookup, so a post whose
/// slug changed since the last run is still updated in place.
pub async fn upsert_post<S>(
    store: &S,
    ctx: &mut ImportContext,
    wp_id: u64,
    slug: &str,
    data: Value,
) -> Result<(DocId, UpsertOutcome), ImportError>
where
    S: ContentStore + ?Sized,
{
    let key = wp_id.to_string();
    let existing = match ctx.posts.get(&key) {
        Some(id) => Some(id.to_string()),
        None => store.find_by(Collection::Posts, "slug", slug).await?,
    };

    let (id, outcome) = match existing {
        Some(id) => (store.update(Collection::Posts, &id, data).await?, UpsertOutcome::Updated),
        None => (store.create(Collection::Posts, data).await?, UpsertOutcome::Created),
    };

    if ctx.posts.insert(key, id.clone()) {
        if let Err(err) = ctx.posts.save() {
            tracing::warn!("post map not saved: {}", err);
        }
    }
    Ok((id, outcome))
}
