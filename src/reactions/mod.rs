pub mod ledger;
pub mod state;

pub use ledger::{ReactionLedger, ReactionOutcome};
pub use state::{transition, ReactionAction, ReactionState, Transition};
