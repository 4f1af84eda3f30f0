use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;
use crate::comments::CommentService;
use crate::content::ContentService;
use crate::reactions::ReactionLedger;

/// GraphQL Schema type
pub type VideoSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. The caller's identity is attached per request.
pub fn build_schema(
    videos: ContentService,
    reactions: ReactionLedger,
    comments: CommentService,
) -> VideoSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(videos)
        .data(reactions)
        .data(comments)
        .finish()
}
