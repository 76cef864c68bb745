//! EmdStatus state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of an earnest-money deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmdStatus {
    #[default]
    Active,
    Expired,
    Refunded,
    Forfeited,
}

impl fmt::Display for EmdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmdStatus::Active => "active",
            EmdStatus::Expired => "expired",
            EmdStatus::Refunded => "refunded",
            EmdStatus::Forfeited => "forfeited",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for EmdStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EmdStatus::*;
        matches!(
            (self, target),
            (Active, Expired) | (Active, Refunded) | (Active, Forfeited)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EmdStatus::*;
        match self {
            Active => vec![Expired, Refunded, Forfeited],
            Expired => vec![],
            Refunded => vec![],
            Forfeited => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_has_outgoing_edges() {
        assert!(!EmdStatus::Active.is_terminal());
        assert!(EmdStatus::Expired.is_terminal());
        assert!(EmdStatus::Refunded.is_terminal());
        assert!(EmdStatus::Forfeited.is_terminal());
    }

    #[test]
    fn expired_cannot_be_refunded() {
        assert!(!EmdStatus::Expired.can_transition_to(&EmdStatus::Refunded));
    }
}
