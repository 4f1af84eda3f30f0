use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::content::{parse_tags, NewContent, UploadedFile};
use crate::db::models::{ContentItem, ContentPatch};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::listing::{CategoryFilter, ContentPage, ContentQuery};
use crate::state::AppState;
use crate::store::{Cursor, SortField, SortOrder};

// --- Query / body shapes ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub owner_id: Option<String>,
    pub is_premium: Option<bool>,
    pub is_short: Option<bool>,
    pub search: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub page_size: Option<usize>,
    pub cursor: Option<String>,
}

impl ListParams {
    fn into_query(self, default_page_size: usize) -> AppResult<ContentQuery> {
        let mut query = ContentQuery::new(self.page_size.unwrap_or(default_page_size))
            .category(
                self.category
                    .as_deref()
                    .map(CategoryFilter::parse)
                    .unwrap_or_default(),
            )
            .sort_by(
                self.sort_field.unwrap_or_default(),
                self.sort_order.unwrap_or_default(),
            );
        if let Some(owner) = self.owner_id {
            query = query.owner(owner);
        }
        if let Some(flag) = self.is_premium {
            query = query.premium(flag);
        }
        if let Some(flag) = self.is_short {
            query = query.short(flag);
        }
        if let Some(term) = self.search {
            query = query.search(term);
        }
        if let Some(token) = self.cursor.as_deref().filter(|t| !t.is_empty()) {
            query = query.starting_after(Some(Cursor::decode(token)?));
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<ContentItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl From<ContentPage> for ListResponse {
    fn from(page: ContentPage) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor.map(|c| c.encode()),
            has_more: page.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub views: i64,
}

// --- Router ---

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/videos",
            get(list_videos)
                .post(upload_video)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/api/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/api/videos/{id}/view", post(record_view))
}

// --- Handlers ---

async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse>> {
    let query = params.into_query(state.videos.default_page_size())?;
    let page = state.videos.list(&query).await?;
    Ok(Json(page.into()))
}

async fn upload_video(
    State(state): State<AppState>,
    user: MaybeUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ContentItem>)> {
    // Reject anonymous uploads before reading the body.
    let identity = crate::auth::require_identity(user.identity())?;

    let mut title = String::new();
    let mut description = String::new();
    let mut category = String::new();
    let mut tags = Vec::new();
    let mut is_premium = false;
    let mut is_short = false;
    let mut duration_secs = 0i64;
    let mut media: Option<UploadedFile> = None;
    let mut thumbnail: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "media" | "thumbnail" => {
                let file_name = field.file_name().map(str::to_string);
                let data: Bytes = field.bytes().await.map_err(bad_multipart)?;
                let file = UploadedFile { file_name, data };
                if name == "media" {
                    media = Some(file);
                } else {
                    thumbnail = Some(file);
                }
            }
            _ => {
                let value = field.text().await.map_err(bad_multipart)?;
                match name.as_str() {
                    "title" => title = value,
                    "description" => description = value,
                    "category" => category = value,
                    "tags" => tags = parse_tags(&value),
                    "isPremium" => is_premium = parse_flag(&value)?,
                    "isShort" => is_short = parse_flag(&value)?,
                    "durationSecs" => {
                        duration_secs = value.trim().parse().map_err(|_| {
                            AppError::BadRequest("durationSecs must be an integer".into())
                        })?
                    }
                    other => tracing::debug!(field = other, "ignoring unknown upload field"),
                }
            }
        }
    }

    let media = media.ok_or_else(|| AppError::BadRequest("Missing media file".into()))?;
    let item = state
        .videos
        .upload(
            Some(identity),
            NewContent {
                title,
                description,
                category,
                tags,
                is_premium,
                is_short,
                duration_secs,
                media,
                thumbnail,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_video(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<ContentItem>> {
    Ok(Json(state.videos.get(user.identity(), &id).await?))
}

async fn update_video(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(patch): Json<ContentPatch>,
) -> AppResult<Json<ContentItem>> {
    Ok(Json(state.videos.update(user.identity(), &id, patch).await?))
}

async fn delete_video(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.videos.delete(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_view(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<ViewResponse>> {
    let views = state.videos.record_view(user.identity(), &id).await?;
    Ok(Json(ViewResponse { views }))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid upload: {e}"))
}

fn parse_flag(value: &str) -> AppResult<bool> {
    match value.trim() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" | "" => Ok(false),
        other => Err(AppError::BadRequest(format!("Invalid boolean '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_build_a_query() {
        let params = ListParams {
            category: Some("Tümü".into()),
            owner_id: Some("u1".into()),
            sort_field: Some(SortField::Views),
            page_size: Some(5),
            ..Default::default()
        };
        let query = params.into_query(20).unwrap();
        assert_eq!(query.category, CategoryFilter::All);
        assert_eq!(query.owner_id.as_deref(), Some("u1"));
        assert_eq!(query.sort.field, SortField::Views);
        assert_eq!(query.sort.order, SortOrder::Desc);
        assert_eq!(query.page_size, 5);
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        let params = ListParams {
            cursor: Some("zz".into()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(20), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn flags_parse() {
        assert!(parse_flag("true").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
