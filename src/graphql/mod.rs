pub mod mutations;
pub mod queries;
pub mod schema;
pub mod types;

use async_graphql::ErrorExtensions;

use crate::error::AppError;

pub use schema::{build_schema, VideoSchema};

/// Carry the error kind and retry hint in the GraphQL error extensions.
pub(crate) fn gql_error(err: AppError) -> async_graphql::Error {
    let code = err.code();
    let retryable = err.is_retryable();
    async_graphql::Error::new(err.to_string()).extend_with(|_, ext| {
        ext.set("code", code);
        ext.set("retryable", retryable);
    })
}
