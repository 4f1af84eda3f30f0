//! In-process adapter for the document store ports.
//!
//! A single async mutex serializes every operation, so each method is one
//! atomic batch regardless of how callers interleave.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    CommentRepo, CommitOutcome, ContentRepo, Counters, ProfileRepo, ReactionRepo, ReactionWrite,
    SortOrder, StoreQuery,
};
use crate::db::models::{
    Comment, ContentItem, ContentPatch, ContentStatus, Profile, ProfileUpdate, ReactionRecord,
    Role, Subject, SubjectKind, WatchEntry,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct Inner {
    videos: HashMap<String, ContentItem>,
    comments: HashMap<String, Comment>,
    reactions: HashMap<(Subject, String), ReactionRecord>,
    profiles: HashMap<String, Profile>,
    history: Vec<WatchEntry>,
}

impl Inner {
    fn counters_mut(&mut self, subject: &Subject) -> Option<(&mut i64, &mut i64)> {
        match subject.kind {
            SubjectKind::Video => self
                .videos
                .get_mut(&subject.id)
                .map(|v| (&mut v.likes, &mut v.dislikes)),
            SubjectKind::Comment => self
                .comments
                .get_mut(&subject.id)
                .map(|c| (&mut c.likes, &mut c.dislikes)),
        }
    }

    fn drop_reactions_on(&mut self, kind: SubjectKind, ids: &[String]) {
        self.reactions
            .retain(|(subject, _), _| !(subject.kind == kind && ids.contains(&subject.id)));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn query_content(&self, query: &StoreQuery) -> AppResult<Vec<ContentItem>> {
        if let Some(cursor) = &query.start_after {
            if cursor.field != query.sort.field {
                return Err(AppError::BadRequest(
                    "Continuation cursor belongs to a different sort field".into(),
                ));
            }
        }

        let inner = self.inner.lock().await;
        let field = query.sort.field;
        let mut items: Vec<ContentItem> = inner
            .videos
            .values()
            .filter(|item| query.filters.iter().all(|f| f.matches(item)))
            .filter(|item| {
                query
                    .start_after
                    .as_ref()
                    .map_or(true, |c| c.precedes(item, query.sort.order))
            })
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            let ka = (field.value_of(a), a.id.as_str());
            let kb = (field.value_of(b), b.id.as_str());
            match query.sort.order {
                SortOrder::Asc => ka.cmp(&kb),
                SortOrder::Desc => kb.cmp(&ka),
            }
        });
        items.truncate(query.limit);
        Ok(items)
    }

    async fn get_content(&self, id: &str) -> AppResult<Option<ContentItem>> {
        Ok(self.inner.lock().await.videos.get(id).cloned())
    }

    async fn insert_content(&self, item: &ContentItem) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.videos.contains_key(&item.id) {
            return Err(AppError::Internal(format!("duplicate content id {}", item.id)));
        }
        inner.videos.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        patch: &ContentPatch,
        at: DateTime<Utc>,
    ) -> AppResult<Option<ContentItem>> {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.videos.get_mut(id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(description) = &patch.description {
            item.description = description.clone();
        }
        if let Some(tags) = &patch.tags {
            item.tags = tags.clone();
        }
        if let Some(is_premium) = patch.is_premium {
            item.is_premium = is_premium;
        }
        item.updated_at = at;
        Ok(Some(item.clone()))
    }

    async fn transition_status(
        &self,
        id: &str,
        from: ContentStatus,
        to: ContentStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.videos.get_mut(id) {
            Some(item) if item.status == from => {
                item.status = to;
                item.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_content(&self, id: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        if inner.videos.remove(id).is_none() {
            return Ok(false);
        }
        let comment_ids: Vec<String> = inner
            .comments
            .values()
            .filter(|c| c.video_id == id)
            .map(|c| c.id.clone())
            .collect();
        inner.drop_reactions_on(SubjectKind::Comment, &comment_ids);
        inner.drop_reactions_on(SubjectKind::Video, &[id.to_string()]);
        inner.comments.retain(|_, c| c.video_id != id);
        inner.history.retain(|h| h.video_id != id);
        Ok(true)
    }

    async fn record_view(
        &self,
        id: &str,
        viewer: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<i64>> {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.videos.get_mut(id) else {
            return Ok(None);
        };
        item.views += 1;
        let views = item.views;

        if let Some(user_id) = viewer {
            inner.history.push(WatchEntry {
                id: uuid::Uuid::now_v7().to_string(),
                user_id: user_id.to_string(),
                video_id: id.to_string(),
                watched_at: at,
            });
            if let Some(profile) = inner.profiles.get_mut(user_id) {
                profile.videos_watched += 1;
            }
        }
        Ok(Some(views))
    }
}

#[async_trait]
impl ReactionRepo for MemoryStore {
    async fn get_reaction(
        &self,
        subject: &Subject,
        user_id: &str,
    ) -> AppResult<Option<ReactionRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .reactions
            .get(&(subject.clone(), user_id.to_string()))
            .cloned())
    }

    async fn commit_reaction(&self, write: &ReactionWrite) -> AppResult<CommitOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.counters_mut(&write.subject).is_none() {
            return Err(AppError::SubjectNotFound);
        }

        let key = (write.subject.clone(), write.user_id.clone());
        let current = inner.reactions.get(&key).map(|r| r.kind);
        if current != write.expected {
            return Ok(CommitOutcome::Conflict);
        }

        match write.next {
            None => {
                inner.reactions.remove(&key);
            }
            Some(kind) => {
                let created_at = inner
                    .reactions
                    .get(&key)
                    .map_or(write.at, |r| r.created_at);
                inner.reactions.insert(
                    key,
                    ReactionRecord {
                        subject: write.subject.clone(),
                        user_id: write.user_id.clone(),
                        kind,
                        created_at,
                        updated_at: write.at,
                    },
                );
            }
        }

        let (likes, dislikes) = inner
            .counters_mut(&write.subject)
            .ok_or(AppError::SubjectNotFound)?;
        *likes += write.likes_delta;
        *dislikes += write.dislikes_delta;
        Ok(CommitOutcome::Applied(Counters {
            likes: *likes,
            dislikes: *dislikes,
        }))
    }
}

#[async_trait]
impl CommentRepo for MemoryStore {
    async fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.videos.contains_key(&comment.video_id) {
            return Err(AppError::SubjectNotFound);
        }
        inner.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> AppResult<Option<Comment>> {
        Ok(self.inner.lock().await.comments.get(id).cloned())
    }

    async fn list_comments(&self, video_id: &str) -> AppResult<Vec<Comment>> {
        let inner = self.inner.lock().await;
        let mut comments: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.video_id == video_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(comments)
    }

    async fn update_comment_body(
        &self,
        id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.comments.get_mut(id) {
            Some(comment) => {
                comment.body = body.to_string();
                comment.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&self, id: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.comments.contains_key(id) {
            return Ok(false);
        }
        let mut doomed: Vec<String> = inner
            .comments
            .values()
            .filter(|c| c.parent_id.as_deref() == Some(id))
            .map(|c| c.id.clone())
            .collect();
        doomed.push(id.to_string());
        inner.drop_reactions_on(SubjectKind::Comment, &doomed);
        inner.comments.retain(|cid, _| !doomed.contains(cid));
        Ok(true)
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(id).cloned())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let mut inner = self.inner.lock().await;
        let Some(profile) = inner.profiles.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &update.display_name {
            profile.display_name = name.clone();
        }
        if let Some(avatar) = &update.avatar_url {
            profile.avatar_url = Some(avatar.clone());
        }
        profile.updated_at = at;
        Ok(Some(profile.clone()))
    }

    async fn set_role(&self, id: &str, role: Role, at: DateTime<Utc>) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.profiles.get_mut(id) {
            Some(profile) => {
                profile.role = role;
                profile.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_premium(
        &self,
        id: &str,
        is_premium: bool,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.profiles.get_mut(id) {
            Some(profile) => {
                profile.is_premium = is_premium;
                profile.premium_expires_at = expires_at;
                profile.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn watch_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<WatchEntry>> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<WatchEntry> = inner
            .history
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.watched_at, &b.id).cmp(&(a.watched_at, &a.id)));
        entries.truncate(limit);
        Ok(entries)
    }
}
