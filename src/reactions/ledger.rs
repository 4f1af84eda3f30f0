use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::state::{transition, ReactionAction, ReactionState};
use crate::auth::identity::{require_identity, Identity};
use crate::content::find_visible;
use crate::db::models::{ReactionKind, Subject, SubjectKind};
use crate::error::{AppError, AppResult};
use crate::store::{CommitOutcome, DocumentStore, ReactionWrite};

/// Bound on read-compute-commit rounds when the ledger moves underneath us.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionOutcome {
    pub subject: Subject,
    pub state: ReactionState,
    pub likes: i64,
    pub dislikes: i64,
}

/// Applies reaction transitions against the store as single atomic writes.
#[derive(Clone)]
pub struct ReactionLedger {
    store: Arc<dyn DocumentStore>,
}

impl ReactionLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The caller's current state on `subject`. Anonymous callers have none.
    pub async fn current(
        &self,
        identity: Option<&Identity>,
        subject: &Subject,
    ) -> AppResult<ReactionState> {
        let Some(identity) = identity else {
            return Ok(ReactionState::None);
        };
        let record = self.store.get_reaction(subject, &identity.user_id).await?;
        Ok(ReactionState::from_kind(record.map(|r| r.kind)))
    }

    pub async fn react(
        &self,
        identity: Option<&Identity>,
        subject: &Subject,
        kind: ReactionKind,
    ) -> AppResult<ReactionOutcome> {
        self.apply(identity, subject, ReactionAction::React(kind))
            .await
    }

    pub async fn clear(
        &self,
        identity: Option<&Identity>,
        subject: &Subject,
    ) -> AppResult<ReactionOutcome> {
        self.apply(identity, subject, ReactionAction::Clear).await
    }

    async fn apply(
        &self,
        identity: Option<&Identity>,
        subject: &Subject,
        action: ReactionAction,
    ) -> AppResult<ReactionOutcome> {
        let identity = require_identity(identity)?;
        self.ensure_visible(identity, subject).await?;

        for attempt in 1..=MAX_ATTEMPTS {
            let current = self
                .store
                .get_reaction(subject, &identity.user_id)
                .await?
                .map(|r| r.kind);
            let step = transition(ReactionState::from_kind(current), action);

            let write = ReactionWrite {
                subject: subject.clone(),
                user_id: identity.user_id.clone(),
                expected: current,
                next: step.to.kind(),
                likes_delta: step.likes_delta,
                dislikes_delta: step.dislikes_delta,
                at: Utc::now(),
            };

            match self.store.commit_reaction(&write).await? {
                CommitOutcome::Applied(counters) => {
                    tracing::debug!(
                        subject = %subject.id,
                        user = %identity.user_id,
                        from = ?step.from,
                        to = ?step.to,
                        "reaction applied"
                    );
                    return Ok(ReactionOutcome {
                        subject: subject.clone(),
                        state: step.to,
                        likes: counters.likes,
                        dislikes: counters.dislikes,
                    });
                }
                CommitOutcome::Conflict => {
                    tracing::debug!(attempt, subject = %subject.id, "reaction ledger moved, retrying");
                }
            }
        }

        Err(AppError::TransientStore(
            "reaction changed concurrently, please retry".into(),
        ))
    }

    /// Subjects on content the caller cannot see are reported as missing.
    async fn ensure_visible(&self, identity: &Identity, subject: &Subject) -> AppResult<()> {
        let video_id = match subject.kind {
            SubjectKind::Video => subject.id.clone(),
            SubjectKind::Comment => {
                self.store
                    .get_comment(&subject.id)
                    .await?
                    .ok_or(AppError::SubjectNotFound)?
                    .video_id
            }
        };
        match find_visible(self.store.as_ref(), Some(identity), &video_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::SubjectNotFound),
        }
    }
}
