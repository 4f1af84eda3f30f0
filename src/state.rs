use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::comments::CommentService;
use crate::config::Config;
use crate::content::ContentService;
use crate::graphql::{build_schema, VideoSchema};
use crate::media::ObjectStore;
use crate::profiles::ProfileService;
use crate::reactions::ReactionLedger;
use crate::store::DocumentStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub media: Arc<dyn ObjectStore>,
    pub videos: ContentService,
    pub reactions: ReactionLedger,
    pub comments: CommentService,
    pub profiles: ProfileService,
    pub graphql_schema: VideoSchema,
}

impl AppState {
    /// Wire every service to the one store. `db` is kept for session lookups.
    pub fn new(
        db: DbPool,
        config: Config,
        store: Arc<dyn DocumentStore>,
        media: Arc<dyn ObjectStore>,
    ) -> Self {
        let videos = ContentService::new(store.clone(), media.clone(), config.listing.clone());
        let reactions = ReactionLedger::new(store.clone());
        let comments = CommentService::new(store.clone());
        let profiles = ProfileService::new(store);
        let graphql_schema = build_schema(videos.clone(), reactions.clone(), comments.clone());

        Self {
            db,
            config,
            media,
            videos,
            reactions,
            comments,
            profiles,
            graphql_schema,
        }
    }
}
