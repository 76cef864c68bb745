//! Append-only audit history for workflow instances.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ActorId, ActorRole, Timestamp};

/// Action recorded by a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Started,
    Advanced,
    Approved,
    Reverted,
    Rejected,
    Escalated,
    Assigned,
    Skipped,
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowAction::Started => "started",
            WorkflowAction::Advanced => "advanced",
            WorkflowAction::Approved => "approved",
            WorkflowAction::Reverted => "reverted",
            WorkflowAction::Rejected => "rejected",
            WorkflowAction::Escalated => "escalated",
            WorkflowAction::Assigned => "assigned",
            WorkflowAction::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Immutable record of one workflow transition.
///
/// Entries are only ever appended; a revert adds a new entry rather than
/// rewriting the one it undoes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Principal that performed the action.
    pub actor: ActorId,
    /// Role the principal acted under.
    pub role: ActorRole,
    /// What happened.
    pub action: WorkflowAction,
    /// Cursor position before the action (None = not started).
    pub from_index: Option<usize>,
    /// Cursor position after the action.
    pub to_index: Option<usize>,
    /// When the action happened.
    pub at: Timestamp,
    /// Free-form remarks supplied by the actor.
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&WorkflowAction::Escalated).unwrap(),
            "\"escalated\""
        );
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = HistoryEntry {
            actor: ActorId::new("officer-1").unwrap(),
            role: ActorRole::Officer,
            action: WorkflowAction::Advanced,
            from_index: Some(0),
            to_index: Some(1),
            at: Timestamp::now(),
            remarks: Some("looks good".to_string()),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
