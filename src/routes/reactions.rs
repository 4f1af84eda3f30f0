use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{ReactionKind, Subject};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::reactions::{ReactionOutcome, ReactionState};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReactionForm {
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct CurrentReaction {
    pub state: ReactionState,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/videos/{id}/reaction",
            get(current_video_reaction)
                .post(react_to_video)
                .delete(clear_video_reaction),
        )
        .route(
            "/api/comments/{id}/reaction",
            get(current_comment_reaction)
                .post(react_to_comment)
                .delete(clear_comment_reaction),
        )
}

async fn current(
    state: &AppState,
    user: &MaybeUser,
    subject: Subject,
) -> AppResult<Json<CurrentReaction>> {
    let reaction = state.reactions.current(user.identity(), &subject).await?;
    Ok(Json(CurrentReaction { state: reaction }))
}

async fn react(
    state: &AppState,
    user: &MaybeUser,
    subject: Subject,
    kind: ReactionKind,
) -> AppResult<Json<ReactionOutcome>> {
    Ok(Json(
        state
            .reactions
            .react(user.identity(), &subject, kind)
            .await?,
    ))
}

async fn clear(
    state: &AppState,
    user: &MaybeUser,
    subject: Subject,
) -> AppResult<Json<ReactionOutcome>> {
    Ok(Json(state.reactions.clear(user.identity(), &subject).await?))
}

async fn current_video_reaction(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<CurrentReaction>> {
    current(&state, &user, Subject::video(id)).await
}

async fn react_to_video(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(form): Json<ReactionForm>,
) -> AppResult<Json<ReactionOutcome>> {
    react(&state, &user, Subject::video(id), form.kind).await
}

async fn clear_video_reaction(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<ReactionOutcome>> {
    clear(&state, &user, Subject::video(id)).await
}

async fn current_comment_reaction(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<CurrentReaction>> {
    current(&state, &user, Subject::comment(id)).await
}

async fn react_to_comment(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(form): Json<ReactionForm>,
) -> AppResult<Json<ReactionOutcome>> {
    react(&state, &user, Subject::comment(id), form.kind).await
}

async fn clear_comment_reaction(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<ReactionOutcome>> {
    clear(&state, &user, Subject::comment(id)).await
}
