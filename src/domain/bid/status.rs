//! BidStatus state machine.
//!
//! The bid lifecycle is a strict DAG: awarded, rejected, and withdrawn
//! are sinks, and awarded is reachable only through shortlisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    Shortlisted,
    Rejected,
    Awarded,
    Withdrawn,
}

impl BidStatus {
    /// True once the bid has left the bidder's hands.
    pub fn is_submitted(&self) -> bool {
        !matches!(self, BidStatus::Draft)
    }

    /// True for the disqualifying sinks that justify deposit forfeiture.
    pub fn is_disqualified(&self) -> bool {
        matches!(self, BidStatus::Rejected | BidStatus::Withdrawn)
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BidStatus::Draft => "draft",
            BidStatus::Submitted => "submitted",
            BidStatus::UnderReview => "under_review",
            BidStatus::Shortlisted => "shortlisted",
            BidStatus::Rejected => "rejected",
            BidStatus::Awarded => "awarded",
            BidStatus::Withdrawn => "withdrawn",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for BidStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use BidStatus::*;
        matches!(
            (self, target),
            (Draft, Submitted)
                | (Submitted, UnderReview)
                | (Submitted, Withdrawn)
                | (UnderReview, Shortlisted)
                | (UnderReview, Rejected)
                | (UnderReview, Withdrawn)
                | (Shortlisted, Awarded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use BidStatus::*;
        match self {
            Draft => vec![Submitted],
            Submitted => vec![UnderReview, Withdrawn],
            UnderReview => vec![Shortlisted, Rejected, Withdrawn],
            Shortlisted => vec![Awarded],
            Rejected => vec![],
            Awarded => vec![],
            Withdrawn => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [BidStatus; 7] = [
        BidStatus::Draft,
        BidStatus::Submitted,
        BidStatus::UnderReview,
        BidStatus::Shortlisted,
        BidStatus::Rejected,
        BidStatus::Awarded,
        BidStatus::Withdrawn,
    ];

    #[test]
    fn sinks_are_terminal() {
        assert!(BidStatus::Awarded.is_terminal());
        assert!(BidStatus::Rejected.is_terminal());
        assert!(BidStatus::Withdrawn.is_terminal());
    }

    #[test]
    fn withdrawn_only_reachable_from_submitted_or_under_review() {
        for status in ALL {
            let reachable = status.can_transition_to(&BidStatus::Withdrawn);
            let expected = matches!(status, BidStatus::Submitted | BidStatus::UnderReview);
            assert_eq!(reachable, expected, "withdrawn from {}", status);
        }
    }

    #[test]
    fn awarded_only_reachable_from_shortlisted() {
        for status in ALL {
            let reachable = status.can_transition_to(&BidStatus::Awarded);
            assert_eq!(reachable, status == BidStatus::Shortlisted, "awarded from {}", status);
        }
    }

    #[test]
    fn graph_is_acyclic() {
        // Walk every path up to the state count; a cycle would allow a
        // path longer than the number of states.
        fn longest_path(from: BidStatus, depth: usize) -> usize {
            assert!(depth <= ALL.len(), "cycle detected through {}", from);
            from.valid_transitions()
                .into_iter()
                .map(|next| 1 + longest_path(next, depth + 1))
                .max()
                .unwrap_or(0)
        }
        assert!(longest_path(BidStatus::Draft, 0) < ALL.len());
    }

    proptest! {
        /// For any sequence of valid transitions, awarded is entered only
        /// through the shortlisted -> awarded edge.
        #[test]
        fn awarded_requires_shortlisted_predecessor(choices in proptest::collection::vec(0usize..7, 0..32)) {
            let mut current = BidStatus::Draft;
            for choice in choices {
                let target = ALL[choice];
                if current.can_transition_to(&target) {
                    if target == BidStatus::Awarded {
                        prop_assert_eq!(current, BidStatus::Shortlisted);
                    }
                    current = target;
                }
            }
        }
    }
}
