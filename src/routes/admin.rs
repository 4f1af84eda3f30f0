use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{ContentItem, ContentStatus, Profile, Role};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: ContentStatus,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumForm {
    pub is_premium: bool,
    pub days: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/videos/{id}/status", post(set_status))
        .route("/api/admin/users/{id}/role", post(set_role))
        .route("/api/admin/users/{id}/premium", post(set_premium))
}

async fn set_status(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> AppResult<Json<ContentItem>> {
    Ok(Json(
        state.videos.moderate(Some(&admin), &id, form.status).await?,
    ))
}

async fn set_role(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<RoleForm>,
) -> AppResult<Json<Profile>> {
    Ok(Json(
        state.profiles.set_role(Some(&admin), &id, form.role).await?,
    ))
}

async fn set_premium(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<PremiumForm>,
) -> AppResult<Json<Profile>> {
    Ok(Json(
        state
            .profiles
            .set_premium(Some(&admin), &id, form.is_premium, form.days)
            .await?,
    ))
}
