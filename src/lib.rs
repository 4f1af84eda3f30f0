// Library exports for VideoHub
// This allows integration tests and the binary to share the service modules

pub mod auth;
pub mod comments;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod listing;
pub mod media;
pub mod profiles;
pub mod reactions;
pub mod routes;
pub mod state;
pub mod store;
