use serde::{Deserialize, Serialize};

use crate::db::models::ReactionKind;

/// A user's reaction state on one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    #[default]
    None,
    Liked,
    Disliked,
}

impl ReactionState {
    pub fn from_kind(kind: Option<ReactionKind>) -> Self {
        match kind {
            Some(ReactionKind::Like) => ReactionState::Liked,
            Some(ReactionKind::Dislike) => ReactionState::Disliked,
            None => ReactionState::None,
        }
    }

    /// The ledger record this state corresponds to; `None` means no record.
    pub fn kind(&self) -> Option<ReactionKind> {
        match self {
            ReactionState::None => None,
            ReactionState::Liked => Some(ReactionKind::Like),
            ReactionState::Disliked => Some(ReactionKind::Dislike),
        }
    }

    fn counts(&self) -> (i64, i64) {
        match self {
            ReactionState::None => (0, 0),
            ReactionState::Liked => (1, 0),
            ReactionState::Disliked => (0, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    /// Like or dislike; repeating the current reaction cancels it.
    React(ReactionKind),
    /// Remove whatever reaction is present.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ReactionState,
    pub to: ReactionState,
    pub likes_delta: i64,
    pub dislikes_delta: i64,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Computes the next state and the counter deltas it implies. No I/O.
pub fn transition(from: ReactionState, action: ReactionAction) -> Transition {
    let to = match (from, action) {
        (_, ReactionAction::Clear) => ReactionState::None,
        (ReactionState::Liked, ReactionAction::React(ReactionKind::Like)) => ReactionState::None,
        (ReactionState::Disliked, ReactionAction::React(ReactionKind::Dislike)) => {
            ReactionState::None
        }
        (_, ReactionAction::React(ReactionKind::Like)) => ReactionState::Liked,
        (_, ReactionAction::React(ReactionKind::Dislike)) => ReactionState::Disliked,
    };

    let (likes_before, dislikes_before) = from.counts();
    let (likes_after, dislikes_after) = to.counts();

    Transition {
        from,
        to,
        likes_delta: likes_after - likes_before,
        dislikes_delta: dislikes_after - dislikes_before,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReactionKind::{Dislike, Like};

    fn react(from: ReactionState, kind: ReactionKind) -> (ReactionState, i64, i64) {
        let t = transition(from, ReactionAction::React(kind));
        (t.to, t.likes_delta, t.dislikes_delta)
    }

    #[test]
    fn transition_table() {
        use ReactionState::*;
        assert_eq!(react(None, Like), (Liked, 1, 0));
        assert_eq!(react(None, Dislike), (Disliked, 0, 1));
        assert_eq!(react(Liked, Like), (None, -1, 0));
        assert_eq!(react(Liked, Dislike), (Disliked, -1, 1));
        assert_eq!(react(Disliked, Dislike), (None, 0, -1));
        assert_eq!(react(Disliked, Like), (Liked, 1, -1));
    }

    #[test]
    fn clear_removes_any_reaction() {
        let t = transition(ReactionState::Liked, ReactionAction::Clear);
        assert_eq!((t.to, t.likes_delta, t.dislikes_delta), (ReactionState::None, -1, 0));

        let t = transition(ReactionState::Disliked, ReactionAction::Clear);
        assert_eq!((t.to, t.likes_delta, t.dislikes_delta), (ReactionState::None, 0, -1));

        let t = transition(ReactionState::None, ReactionAction::Clear);
        assert!(t.is_noop());
        assert_eq!((t.likes_delta, t.dislikes_delta), (0, 0));
    }

    #[test]
    fn same_reaction_twice_cancels() {
        for kind in [Like, Dislike] {
            let first = transition(ReactionState::None, ReactionAction::React(kind));
            let second = transition(first.to, ReactionAction::React(kind));
            assert_eq!(second.to, ReactionState::None);
            assert_eq!(first.likes_delta + second.likes_delta, 0);
            assert_eq!(first.dislikes_delta + second.dislikes_delta, 0);
        }
    }

    #[test]
    fn any_sequence_leaves_at_most_one_reaction() {
        // Every sequence of length 6 over {like, dislike}
        for mask in 0u32..64 {
            let mut state = ReactionState::None;
            let (mut likes, mut dislikes) = (0i64, 0i64);
            for step in 0..6 {
                let kind = if mask & (1 << step) == 0 { Like } else { Dislike };
                let t = transition(state, ReactionAction::React(kind));
                likes += t.likes_delta;
                dislikes += t.dislikes_delta;
                state = t.to;
                assert!((0..=1).contains(&likes));
                assert!((0..=1).contains(&dislikes));
                assert!(likes + dislikes <= 1);
                assert_eq!((likes, dislikes), state.counts());
            }
        }
    }

    #[test]
    fn state_maps_to_ledger_kind() {
        for state in [
            ReactionState::None,
            ReactionState::Liked,
            ReactionState::Disliked,
        ] {
            assert_eq!(ReactionState::from_kind(state.kind()), state);
        }
    }
}
