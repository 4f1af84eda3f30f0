//! Content lifecycle: listing, upload, edits, moderation, removal and views.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::auth::{require_identity, Identity};
use crate::config::ListingConfig;
use crate::db::models::{ContentItem, ContentPatch, ContentStatus};
use crate::error::{AppError, AppResult};
use crate::listing::{fetch_page, ContentPage, ContentQuery};
use crate::media::{object_key, ObjectStore};
use crate::store::DocumentStore;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_TAGS: usize = 20;

/// Published items are public; anything else is visible only to its owner
/// and admins.
pub fn visible_to(item: &ContentItem, identity: Option<&Identity>) -> bool {
    item.status == ContentStatus::Published
        || identity.is_some_and(|who| who.can_manage(&item.owner_id))
}

/// The item behind `id`, or `None` when it is missing or hidden from the caller.
pub async fn find_visible(
    store: &dyn DocumentStore,
    identity: Option<&Identity>,
    id: &str,
) -> AppResult<Option<ContentItem>> {
    Ok(store
        .get_content(id)
        .await?
        .filter(|item| visible_to(item, identity)))
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_premium: bool,
    pub is_short: bool,
    pub duration_secs: i64,
    pub media: UploadedFile,
    pub thumbnail: Option<UploadedFile>,
}

/// Split a comma-separated tag string, trimming and dropping blanks and repeats.
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(',').map(str::to_string).collect())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Title must be {MAX_TITLE_CHARS} characters or less"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> AppResult<String> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::BadRequest(format!(
            "Description must be {MAX_DESCRIPTION_CHARS} characters or less"
        )));
    }
    Ok(description.to_string())
}

fn validate_tags(tags: Vec<String>) -> AppResult<Vec<String>> {
    let tags = normalize_tags(tags);
    if tags.len() > MAX_TAGS {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(tags)
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn DocumentStore>,
    media: Arc<dyn ObjectStore>,
    listing: ListingConfig,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        media: Arc<dyn ObjectStore>,
        listing: ListingConfig,
    ) -> Self {
        Self {
            store,
            media,
            listing,
        }
    }

    pub fn default_page_size(&self) -> usize {
        self.listing.default_page_size
    }

    pub async fn list(&self, query: &ContentQuery) -> AppResult<ContentPage> {
        if query.page_size > self.listing.max_page_size {
            return Err(AppError::BadRequest(format!(
                "pageSize must be at most {}",
                self.listing.max_page_size
            )));
        }
        fetch_page(self.store.as_ref(), query).await
    }

    pub async fn get(&self, identity: Option<&Identity>, id: &str) -> AppResult<ContentItem> {
        find_visible(self.store.as_ref(), identity, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn upload(
        &self,
        identity: Option<&Identity>,
        new: NewContent,
    ) -> AppResult<ContentItem> {
        let identity = require_identity(identity)?;

        let title = validate_title(&new.title)?;
        let description = validate_description(&new.description)?;
        let tags = validate_tags(new.tags)?;
        let category = new.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::BadRequest("Category is required".into()));
        }
        if new.duration_secs < 0 {
            return Err(AppError::BadRequest("Duration cannot be negative".into()));
        }
        if new.media.data.is_empty() {
            return Err(AppError::BadRequest("Media file is empty".into()));
        }

        let media_key = object_key("videos", &identity.user_id, new.media.file_name.as_deref());
        let media_url = self.media.put(&media_key, new.media.data).await?;

        let thumbnail_url = match new.thumbnail.filter(|t| !t.data.is_empty()) {
            Some(thumb) => {
                let key = object_key("thumbnails", &identity.user_id, thumb.file_name.as_deref());
                match self.media.put(&key, thumb.data).await {
                    Ok(locator) => Some(locator),
                    Err(e) => {
                        self.discard(&[Some(media_url)]).await;
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let now = Utc::now();
        let item = ContentItem {
            id: uuid::Uuid::now_v7().to_string(),
            title,
            description,
            media_url,
            thumbnail_url,
            duration_secs: new.duration_secs,
            category,
            tags,
            is_premium: new.is_premium,
            is_short: new.is_short,
            status: ContentStatus::Processing,
            owner_id: identity.user_id.clone(),
            views: 0,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_content(&item).await {
            self.discard(&[Some(item.media_url.clone()), item.thumbnail_url.clone()])
                .await;
            return Err(e);
        }

        tracing::info!(id = %item.id, owner = %item.owner_id, "content uploaded");
        Ok(item)
    }

    /// Owner-only edit of title, description, tags and premium flag.
    pub async fn update(
        &self,
        identity: Option<&Identity>,
        id: &str,
        patch: ContentPatch,
    ) -> AppResult<ContentItem> {
        let identity = require_identity(identity)?;
        let item = self
            .store
            .get_content(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if item.owner_id != identity.user_id {
            return Err(AppError::Forbidden);
        }
        if patch.is_empty() {
            return Ok(item);
        }

        let patch = ContentPatch {
            title: patch.title.as_deref().map(validate_title).transpose()?,
            description: patch
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            tags: patch.tags.map(validate_tags).transpose()?,
            is_premium: patch.is_premium,
        };

        self.store
            .update_content(id, &patch, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Owner or admin. Storage objects go first, then the record and everything
    /// hanging off it.
    pub async fn delete(&self, identity: Option<&Identity>, id: &str) -> AppResult<()> {
        let identity = require_identity(identity)?;
        let item = self
            .store
            .get_content(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !identity.can_manage(&item.owner_id) {
            return Err(AppError::Forbidden);
        }

        self.media.delete(&item.media_url).await?;
        if let Some(thumb) = &item.thumbnail_url {
            self.media.delete(thumb).await?;
        }
        if !self.store.delete_content(id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(id, by = %identity.user_id, "content deleted");
        Ok(())
    }

    /// Admin decision on a processing item.
    pub async fn moderate(
        &self,
        identity: Option<&Identity>,
        id: &str,
        to: ContentStatus,
    ) -> AppResult<ContentItem> {
        let identity = require_identity(identity)?;
        if !identity.is_admin() {
            return Err(AppError::Forbidden);
        }

        let item = self
            .store
            .get_content(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !item.status.can_transition_to(to) {
            return Err(AppError::InvalidTransition {
                from: item.status,
                to,
            });
        }

        if !self
            .store
            .transition_status(id, item.status, to, Utc::now())
            .await?
        {
            // Someone else moved it first.
            let current = self
                .store
                .get_content(id)
                .await?
                .ok_or(AppError::NotFound)?;
            return Err(AppError::InvalidTransition {
                from: current.status,
                to,
            });
        }

        tracing::info!(id, from = %item.status, to = %to, "content moderated");
        self.store
            .get_content(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Count a view. Identified viewers also get a watch-history entry.
    pub async fn record_view(&self, identity: Option<&Identity>, id: &str) -> AppResult<i64> {
        if find_visible(self.store.as_ref(), identity, id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let viewer = identity.map(|who| who.user_id.as_str());
        self.store
            .record_view(id, viewer, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn discard(&self, locators: &[Option<String>]) {
        for locator in locators.iter().flatten() {
            if let Err(e) = self.media.delete(locator).await {
                tracing::warn!(locator, error = %e, "failed to remove orphaned object");
            }
        }
    }
}
