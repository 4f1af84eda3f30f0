pub mod admin;
pub mod comments;
pub mod graphql;
pub mod media;
pub mod profile;
pub mod reactions;
pub mod videos;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes();
    Router::new()
        .merge(videos::router(max_upload))
        .merge(reactions::router())
        .merge(comments::router())
        .merge(profile::router())
        .merge(admin::router())
        .merge(media::router())
        .merge(graphql::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
