use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::auth::{require_identity, Identity};
use crate::content::find_visible;
use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::store::DocumentStore;

pub const MAX_COMMENT_CHARS: usize = 1000;

/// A top-level comment and its replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

fn validate_body(body: &str) -> AppResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment must be {MAX_COMMENT_CHARS} characters or less"
        )));
    }
    Ok(body.to_string())
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn DocumentStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Replies may only target a top-level comment on the same video.
    pub async fn add(
        &self,
        identity: Option<&Identity>,
        video_id: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> AppResult<Comment> {
        let identity = require_identity(identity)?;
        let body = validate_body(body)?;

        if find_visible(self.store.as_ref(), Some(identity), video_id)
            .await?
            .is_none()
        {
            return Err(AppError::SubjectNotFound);
        }
        if let Some(parent_id) = parent_id {
            let parent = self
                .store
                .get_comment(parent_id)
                .await?
                .ok_or(AppError::SubjectNotFound)?;
            if parent.video_id != video_id {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to another video".into(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::BadRequest("Replies cannot be nested".into()));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: uuid::Uuid::now_v7().to_string(),
            video_id: video_id.to_string(),
            author_id: identity.user_id.clone(),
            parent_id: parent_id.map(str::to_string),
            body,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_comment(&comment).await?;
        Ok(comment)
    }

    /// Top-level comments newest first, each with its replies oldest first.
    pub async fn thread(
        &self,
        identity: Option<&Identity>,
        video_id: &str,
    ) -> AppResult<Vec<CommentThread>> {
        if find_visible(self.store.as_ref(), identity, video_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound);
        }
        let comments = self.store.list_comments(video_id).await?;

        let (tops, replies): (Vec<Comment>, Vec<Comment>) =
            comments.into_iter().partition(|c| c.parent_id.is_none());

        let mut threads: Vec<CommentThread> = tops
            .into_iter()
            .rev()
            .map(|comment| CommentThread {
                comment,
                replies: Vec::new(),
            })
            .collect();
        for reply in replies {
            if let Some(thread) = threads
                .iter_mut()
                .find(|t| Some(&t.comment.id) == reply.parent_id.as_ref())
            {
                thread.replies.push(reply);
            }
        }
        Ok(threads)
    }

    pub async fn edit(
        &self,
        identity: Option<&Identity>,
        id: &str,
        body: &str,
    ) -> AppResult<Comment> {
        let identity = require_identity(identity)?;
        let body = validate_body(body)?;
        let comment = self
            .store
            .get_comment(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if comment.author_id != identity.user_id {
            return Err(AppError::Forbidden);
        }
        if !self.store.update_comment_body(id, &body, Utc::now()).await? {
            return Err(AppError::NotFound);
        }
        self.store.get_comment(id).await?.ok_or(AppError::NotFound)
    }

    /// Author or admin. Removing a top-level comment removes its replies.
    pub async fn delete(&self, identity: Option<&Identity>, id: &str) -> AppResult<()> {
        let identity = require_identity(identity)?;
        let comment = self
            .store
            .get_comment(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !identity.can_manage(&comment.author_id) {
            return Err(AppError::Forbidden);
        }
        if !self.store.delete_comment(id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{from_micros, ContentItem, ContentStatus, Role};
    use crate::store::{CommentRepo, ContentRepo, MemoryStore};

    fn who(id: &str) -> Identity {
        Identity {
            user_id: id.into(),
            role: Role::User,
            is_premium: false,
        }
    }

    async fn setup() -> (CommentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let at = from_micros(1_700_000_000_000_000);
        store
            .insert_content(&ContentItem {
                id: "v1".into(),
                title: "Video".into(),
                description: String::new(),
                media_url: "/media/videos/o/v1.mp4".into(),
                thumbnail_url: None,
                duration_secs: 10,
                category: "Komedi".into(),
                tags: vec![],
                is_premium: false,
                is_short: false,
                status: ContentStatus::Published,
                owner_id: "o".into(),
                views: 0,
                likes: 0,
                dislikes: 0,
                created_at: at,
                updated_at: at,
            })
            .await
            .unwrap();
        (CommentService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn threads_order_tops_newest_first_and_replies_oldest_first() {
        let (svc, _) = setup().await;
        let a = who("a");
        let first = svc.add(Some(&a), "v1", "ilk", None).await.unwrap();
        let second = svc.add(Some(&a), "v1", "ikinci", None).await.unwrap();
        let r1 = svc.add(Some(&a), "v1", "cevap 1", Some(&first.id)).await.unwrap();
        let r2 = svc.add(Some(&a), "v1", "cevap 2", Some(&first.id)).await.unwrap();

        let threads = svc.thread(None, "v1").await.unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, second.id);
        assert_eq!(threads[1].comment.id, first.id);
        let reply_ids: Vec<&str> = threads[1].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(reply_ids, vec![r1.id.as_str(), r2.id.as_str()]);
    }

    #[tokio::test]
    async fn replies_are_one_level_deep() {
        let (svc, _) = setup().await;
        let a = who("a");
        let top = svc.add(Some(&a), "v1", "top", None).await.unwrap();
        let reply = svc.add(Some(&a), "v1", "reply", Some(&top.id)).await.unwrap();

        assert!(matches!(
            svc.add(Some(&a), "v1", "deeper", Some(&reply.id)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.add(Some(&a), "v1", "x", Some("missing")).await,
            Err(AppError::SubjectNotFound)
        ));
    }

    #[tokio::test]
    async fn body_rules_and_missing_video() {
        let (svc, _) = setup().await;
        let a = who("a");
        assert!(matches!(
            svc.add(Some(&a), "v1", "   ", None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.add(Some(&a), "v1", &"x".repeat(MAX_COMMENT_CHARS + 1), None)
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.add(Some(&a), "nope", "hi", None).await,
            Err(AppError::SubjectNotFound)
        ));
        assert!(matches!(
            svc.add(None, "v1", "hi", None).await,
            Err(AppError::AuthenticationRequired)
        ));
        let c = svc.add(Some(&a), "v1", "  trimmed  ", None).await.unwrap();
        assert_eq!(c.body, "trimmed");
    }

    #[tokio::test]
    async fn edit_by_author_delete_cascades_replies() {
        let (svc, store) = setup().await;
        let a = who("a");
        let b = who("b");
        let top = svc.add(Some(&a), "v1", "top", None).await.unwrap();
        let reply = svc.add(Some(&b), "v1", "reply", Some(&top.id)).await.unwrap();

        assert!(matches!(
            svc.edit(Some(&b), &top.id, "hijack").await,
            Err(AppError::Forbidden)
        ));
        assert_eq!(svc.edit(Some(&a), &top.id, "edited").await.unwrap().body, "edited");

        assert!(matches!(
            svc.delete(Some(&b), &top.id).await,
            Err(AppError::Forbidden)
        ));
        svc.delete(Some(&a), &top.id).await.unwrap();
        assert!(store.get_comment(&reply.id).await.unwrap().is_none());
        assert!(svc.thread(None, "v1").await.unwrap().is_empty());
    }
}
