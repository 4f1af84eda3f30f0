//! # Document store ports
//!
//! Every component receives its store explicitly as an
//! `Arc<dyn DocumentStore>`; nothing reaches for a global.
//!
//! Adapters must provide: equality filters combined with ordering on an
//! indexed field, keyset pagination (`start_after`), counter increments that
//! do not depend on a previously read value, and all-or-nothing batches.

pub mod memory;
pub mod query;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{
    Comment, ContentItem, ContentPatch, ContentStatus, Profile, ProfileUpdate, ReactionKind,
    ReactionRecord, Role, Subject, WatchEntry,
};
use crate::error::AppResult;

pub use memory::MemoryStore;
pub use query::{Cursor, Filter, Sort, SortField, SortOrder, StoreQuery};
pub use sqlite::SqliteStore;

/// Like/dislike counters of a subject after a committed change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub likes: i64,
    pub dislikes: i64,
}

/// One atomic reaction change: ledger write (or delete) plus counter deltas,
/// guarded by the ledger state the caller computed the change from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionWrite {
    pub subject: Subject,
    pub user_id: String,
    pub expected: Option<ReactionKind>,
    pub next: Option<ReactionKind>,
    pub likes_delta: i64,
    pub dislikes_delta: i64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied(Counters),
    /// The ledger no longer held `expected`; nothing was written.
    Conflict,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn query_content(&self, query: &StoreQuery) -> AppResult<Vec<ContentItem>>;
    async fn get_content(&self, id: &str) -> AppResult<Option<ContentItem>>;
    async fn insert_content(&self, item: &ContentItem) -> AppResult<()>;
    async fn update_content(
        &self,
        id: &str,
        patch: &ContentPatch,
        at: DateTime<Utc>,
    ) -> AppResult<Option<ContentItem>>;
    /// Compare-and-set on the status column. Returns false when the item is
    /// missing or no longer in `from`.
    async fn transition_status(
        &self,
        id: &str,
        from: ContentStatus,
        to: ContentStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
    /// Removes the item together with its comments and every reaction on
    /// either.
    async fn delete_content(&self, id: &str) -> AppResult<bool>;
    /// Increments `views`; for a known viewer also appends to their watch
    /// history and bumps their watched counter, all in one batch.
    async fn record_view(
        &self,
        id: &str,
        viewer: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<i64>>;
}

#[async_trait]
pub trait ReactionRepo: Send + Sync {
    async fn get_reaction(
        &self,
        subject: &Subject,
        user_id: &str,
    ) -> AppResult<Option<ReactionRecord>>;
    /// Fails with `SubjectNotFound` when the subject does not exist.
    async fn commit_reaction(&self, write: &ReactionWrite) -> AppResult<CommitOutcome>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> AppResult<()>;
    async fn get_comment(&self, id: &str) -> AppResult<Option<Comment>>;
    /// All comments on a video, oldest first.
    async fn list_comments(&self, video_id: &str) -> AppResult<Vec<Comment>>;
    async fn update_comment_body(&self, id: &str, body: &str, at: DateTime<Utc>)
        -> AppResult<bool>;
    /// Removes the comment, its replies and their reactions.
    async fn delete_comment(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn insert_profile(&self, profile: &Profile) -> AppResult<()>;
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>>;
    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Profile>>;
    async fn set_role(&self, id: &str, role: Role, at: DateTime<Utc>) -> AppResult<bool>;
    async fn set_premium(
        &self,
        id: &str,
        is_premium: bool,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
    /// Newest first.
    async fn watch_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<WatchEntry>>;
}

pub trait DocumentStore: ContentRepo + ReactionRepo + CommentRepo + ProfileRepo {}

impl<T> DocumentStore for T where T: ContentRepo + ReactionRepo + CommentRepo + ProfileRepo {}
