use axum::extract::{Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::session::delete_session;
use crate::db::models::{Profile, ProfileUpdate, WatchEntry};
use crate::error::AppResult;
use crate::extractors::{extract_session_token, CurrentUser};
use crate::profiles::DEFAULT_HISTORY_LIMIT;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// The caller's profile plus whether premium is in effect right now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub premium_active: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me).patch(update_me))
        .route("/api/me/history", get(history))
        .route("/api/logout", post(logout))
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let profile = state.profiles.me(Some(&me)).await?;
    Ok(Json(MeResponse {
        profile,
        premium_active: me.is_premium,
    }))
}

async fn update_me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<MeResponse>> {
    let profile = state.profiles.update_me(Some(&me), update).await?;
    Ok(Json(MeResponse {
        profile,
        premium_active: me.is_premium,
    }))
}

async fn history(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<Vec<WatchEntry>>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(200);
    Ok(Json(state.profiles.history(Some(&me), limit).await?))
}

/// Drop the session the request was made with.
async fn logout(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    parts: Parts,
) -> AppResult<StatusCode> {
    if let Some(token) = extract_session_token(&parts, &state.config.auth.cookie_name) {
        delete_session(&state.db, token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
