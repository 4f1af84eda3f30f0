use async_graphql::*;

use super::gql_error;
use crate::auth::Identity;
use crate::db::models::Subject;
use crate::graphql::types::{Reaction, ReactionResult, ReactionSubject};
use crate::reactions::ReactionLedger;

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Like or dislike a video or comment. Repeating the current reaction removes it.
    async fn react(
        &self,
        ctx: &Context<'_>,
        subject: ReactionSubject,
        id: String,
        kind: Reaction,
    ) -> Result<ReactionResult> {
        let ledger = ctx.data::<ReactionLedger>()?;
        let subject = Subject {
            kind: subject.into(),
            id,
        };
        let outcome = ledger
            .react(ctx.data_opt::<Identity>(), &subject, kind.into())
            .await
            .map_err(gql_error)?;
        Ok(outcome.into())
    }

    /// Remove whatever reaction the caller has on the subject
    async fn clear_reaction(
        &self,
        ctx: &Context<'_>,
        subject: ReactionSubject,
        id: String,
    ) -> Result<ReactionResult> {
        let ledger = ctx.data::<ReactionLedger>()?;
        let subject = Subject {
            kind: subject.into(),
            id,
        };
        let outcome = ledger
            .clear(ctx.data_opt::<Identity>(), &subject)
            .await
            .map_err(gql_error)?;
        Ok(outcome.into())
    }
}
