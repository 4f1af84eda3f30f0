use async_graphql::*;
use chrono::{DateTime, Utc};

use crate::comments::CommentThread;
use crate::db::models::{Comment, ContentItem, ContentStatus, ReactionKind, SubjectKind};
use crate::listing::ContentPage;
use crate::reactions::{ReactionOutcome, ReactionState};
use crate::store::{SortField, SortOrder};

/// A published video or short-form clip
#[derive(Clone, Debug, SimpleObject)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub thumbnail_url: Option<String>,
    /// Length in seconds
    pub duration_secs: i64,
    pub category: String,
    pub tags: Vec<String>,
    pub is_premium: bool,
    pub is_short: bool,
    pub status: VideoStatus,
    pub owner_id: String,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContentItem> for Video {
    fn from(item: ContentItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            media_url: item.media_url,
            thumbnail_url: item.thumbnail_url,
            duration_secs: item.duration_secs,
            category: item.category,
            tags: item.tags,
            is_premium: item.is_premium,
            is_short: item.is_short,
            status: item.status.into(),
            owner_id: item.owner_id,
            views: item.views,
            likes: item.likes,
            dislikes: item.dislikes,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum VideoStatus {
    Processing,
    Published,
    Rejected,
}

impl From<ContentStatus> for VideoStatus {
    fn from(status: ContentStatus) -> Self {
        match status {
            ContentStatus::Processing => VideoStatus::Processing,
            ContentStatus::Published => VideoStatus::Published,
            ContentStatus::Rejected => VideoStatus::Rejected,
        }
    }
}

/// One page of videos plus the token for the next one
#[derive(Clone, Debug, SimpleObject)]
pub struct VideoConnection {
    pub items: Vec<Video>,
    /// Pass back as `filter.cursor` to continue; absent on the last page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl From<ContentPage> for VideoConnection {
    fn from(page: ContentPage) -> Self {
        Self {
            items: page.items.into_iter().map(Video::from).collect(),
            next_cursor: page.next_cursor.map(|c| c.encode()),
            has_more: page.has_more,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum VideoSortField {
    CreatedAt,
    Views,
    Likes,
}

impl From<VideoSortField> for SortField {
    fn from(field: VideoSortField) -> Self {
        match field {
            VideoSortField::CreatedAt => SortField::CreatedAt,
            VideoSortField::Views => SortField::Views,
            VideoSortField::Likes => SortField::Likes,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl From<SortDirection> for SortOrder {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => SortOrder::Asc,
            SortDirection::Desc => SortOrder::Desc,
        }
    }
}

/// Listing options; everything is optional
#[derive(Clone, Debug, Default, InputObject)]
pub struct VideoFilter {
    /// Category name, or "all"
    pub category: Option<String>,
    pub owner_id: Option<String>,
    pub is_premium: Option<bool>,
    pub is_short: Option<bool>,
    /// Case-insensitive match over title, description and tags
    pub search: Option<String>,
    pub sort_field: Option<VideoSortField>,
    pub sort_order: Option<SortDirection>,
    pub page_size: Option<i32>,
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CommentNode {
    pub id: String,
    pub video_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Oldest first; always empty on replies
    pub replies: Vec<CommentNode>,
}

impl From<Comment> for CommentNode {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            video_id: c.video_id,
            author_id: c.author_id,
            parent_id: c.parent_id,
            body: c.body,
            likes: c.likes,
            dislikes: c.dislikes,
            created_at: c.created_at,
            updated_at: c.updated_at,
            replies: Vec::new(),
        }
    }
}

impl From<CommentThread> for CommentNode {
    fn from(thread: CommentThread) -> Self {
        let mut node = CommentNode::from(thread.comment);
        node.replies = thread.replies.into_iter().map(CommentNode::from).collect();
        node
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum ReactionSubject {
    Video,
    Comment,
}

impl From<ReactionSubject> for SubjectKind {
    fn from(kind: ReactionSubject) -> Self {
        match kind {
            ReactionSubject::Video => SubjectKind::Video,
            ReactionSubject::Comment => SubjectKind::Comment,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl From<Reaction> for ReactionKind {
    fn from(kind: Reaction) -> Self {
        match kind {
            Reaction::Like => ReactionKind::Like,
            Reaction::Dislike => ReactionKind::Dislike,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
#[graphql(name = "ReactionState")]
pub enum ReactionStateValue {
    None,
    Liked,
    Disliked,
}

impl From<ReactionState> for ReactionStateValue {
    fn from(state: ReactionState) -> Self {
        match state {
            ReactionState::None => ReactionStateValue::None,
            ReactionState::Liked => ReactionStateValue::Liked,
            ReactionState::Disliked => ReactionStateValue::Disliked,
        }
    }
}

/// Caller's reaction state and the subject's counters after a change
#[derive(Clone, Debug, SimpleObject)]
pub struct ReactionResult {
    pub subject_id: String,
    pub state: ReactionStateValue,
    pub likes: i64,
    pub dislikes: i64,
}

impl From<ReactionOutcome> for ReactionResult {
    fn from(outcome: ReactionOutcome) -> Self {
        Self {
            subject_id: outcome.subject.id,
            state: outcome.state.into(),
            likes: outcome.likes,
            dislikes: outcome.dislikes,
        }
    }
}
