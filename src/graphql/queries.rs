use async_graphql::*;

use super::gql_error;
use crate::auth::Identity;
use crate::comments::CommentService;
use crate::content::ContentService;
use crate::error::AppError;
use crate::graphql::types::{CommentNode, Video, VideoConnection, VideoFilter};
use crate::listing::{CategoryFilter, ContentQuery};
use crate::store::{Cursor, SortField, SortOrder};

/// Build a listing query from GraphQL filter input
pub(crate) fn content_query(filter: VideoFilter, default_page_size: usize) -> Result<ContentQuery> {
    let page_size = match filter.page_size {
        Some(n) if n <= 0 => {
            return Err(gql_error(AppError::BadRequest(
                "pageSize must be greater than 0".into(),
            )))
        }
        Some(n) => n as usize,
        None => default_page_size,
    };

    let mut query = ContentQuery::new(page_size)
        .category(
            filter
                .category
                .as_deref()
                .map(CategoryFilter::parse)
                .unwrap_or_default(),
        )
        .sort_by(
            filter.sort_field.map(SortField::from).unwrap_or_default(),
            filter.sort_order.map(SortOrder::from).unwrap_or_default(),
        );
    if let Some(owner) = filter.owner_id {
        query = query.owner(owner);
    }
    if let Some(flag) = filter.is_premium {
        query = query.premium(flag);
    }
    if let Some(flag) = filter.is_short {
        query = query.short(flag);
    }
    if let Some(term) = filter.search {
        query = query.search(term);
    }
    if let Some(token) = filter.cursor.as_deref() {
        query = query.starting_after(Some(Cursor::decode(token).map_err(gql_error)?));
    }
    Ok(query)
}

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Published videos matching the filter, one page at a time
    async fn videos(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: VideoFilter,
    ) -> Result<VideoConnection> {
        let videos = ctx.data::<ContentService>()?;
        let query = content_query(filter, videos.default_page_size())?;
        let page = videos.list(&query).await.map_err(gql_error)?;
        Ok(page.into())
    }

    /// A single video; unpublished ones are visible to their owner and admins only
    async fn video(&self, ctx: &Context<'_>, id: String) -> Result<Option<Video>> {
        let videos = ctx.data::<ContentService>()?;
        match videos.get(ctx.data_opt::<Identity>(), &id).await {
            Ok(item) => Ok(Some(item.into())),
            Err(AppError::NotFound) => Ok(None),
            Err(e) => Err(gql_error(e)),
        }
    }

    /// Top-level comments newest first, each with replies oldest first
    async fn comments(&self, ctx: &Context<'_>, video_id: String) -> Result<Vec<CommentNode>> {
        let comments = ctx.data::<CommentService>()?;
        let threads = comments
            .thread(ctx.data_opt::<Identity>(), &video_id)
            .await
            .map_err(gql_error)?;
        Ok(threads.into_iter().map(CommentNode::from).collect())
    }
}
