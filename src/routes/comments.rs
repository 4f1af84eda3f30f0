use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::comments::CommentThread;
use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentForm {
    pub body: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditCommentForm {
    pub body: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/videos/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/comments/{id}",
            patch(edit_comment).delete(delete_comment),
        )
}

async fn list_comments(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(video_id): Path<String>,
) -> AppResult<Json<Vec<CommentThread>>> {
    Ok(Json(
        state.comments.thread(user.identity(), &video_id).await?,
    ))
}

async fn create_comment(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(video_id): Path<String>,
    Json(form): Json<CreateCommentForm>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .comments
        .add(
            user.identity(),
            &video_id,
            &form.body,
            form.parent_id.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn edit_comment(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(form): Json<EditCommentForm>,
) -> AppResult<Json<Comment>> {
    Ok(Json(
        state.comments.edit(user.identity(), &id, &form.body).await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.comments.delete(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
