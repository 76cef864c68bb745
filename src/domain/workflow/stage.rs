//! Stage record and its status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ActorId, ActorRole, StateMachine, Timestamp};

use super::StageDefinition;

/// Progress of a single workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Skipped,
}

impl StageStatus {
    /// Returns true if the stage still awaits work.
    pub fn is_open(&self) -> bool {
        matches!(self, StageStatus::Pending | StageStatus::Active)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Pending => "pending",
            StageStatus::Active => "active",
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for StageStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StageStatus::*;
        matches!(
            (self, target),
            // Activation when the cursor reaches the stage
            (Pending, Active) |
            // Administrative skip of a stage not yet reached
            (Pending, Skipped) |
            // Sign-off
            (Active, Completed) |
            // Revert: the current stage returns to the queue
            (Active, Pending) |
            // Revert: the prior stage is reopened
            (Completed, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use StageStatus::*;
        match self {
            Pending => vec![Active, Skipped],
            Active => vec![Completed, Pending],
            Completed => vec![Active],
            Skipped => vec![],
        }
    }
}

/// One named step of a workflow instance.
///
/// Stages are owned exclusively by their instance; all mutation goes
/// through `WorkflowInstance` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name, unique within the instance.
    pub name: String,
    /// Role that must sign this stage off.
    pub required_role: ActorRole,
    /// Current progress.
    pub status: StageStatus,
    /// Principal the stage is assigned to, if any.
    pub assignee: Option<ActorId>,
    /// When the stage was last activated.
    pub started_at: Option<Timestamp>,
    /// When the stage was completed.
    pub completed_at: Option<Timestamp>,
    /// Free-form notes recorded at sign-off.
    pub notes: Option<String>,
    /// Priority flag set by escalation.
    pub escalated: bool,
    /// Planned duration, carried from the stage definition.
    pub duration_days: u32,
}

impl Stage {
    /// Stamps a fresh pending stage from its definition.
    pub fn from_definition(def: &StageDefinition) -> Self {
        Self {
            name: def.name.clone(),
            required_role: def.required_role,
            status: StageStatus::Pending,
            assignee: None,
            started_at: None,
            completed_at: None,
            notes: None,
            escalated: false,
            duration_days: def.duration_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(StageStatus::default(), StageStatus::Pending);
    }

    #[test]
    fn skipped_is_terminal() {
        assert!(StageStatus::Skipped.is_terminal());
        assert!(!StageStatus::Completed.is_terminal());
    }

    #[test]
    fn completed_can_only_reactivate() {
        assert_eq!(
            StageStatus::Completed.valid_transitions(),
            vec![StageStatus::Active]
        );
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        assert!(!StageStatus::Pending.can_transition_to(&StageStatus::Completed));
    }

    #[test]
    fn active_cannot_be_skipped() {
        assert!(!StageStatus::Active.can_transition_to(&StageStatus::Skipped));
    }

    #[test]
    fn from_definition_starts_clean() {
        let def = StageDefinition::new("Draft-Review", ActorRole::Officer, 3);
        let stage = Stage::from_definition(&def);
        assert_eq!(stage.name, "Draft-Review");
        assert_eq!(stage.status, StageStatus::Pending);
        assert_eq!(stage.required_role, ActorRole::Officer);
        assert!(stage.assignee.is_none());
        assert!(!stage.escalated);
        assert_eq!(stage.duration_days, 3);
    }

    #[test]
    fn is_open_matches_pending_and_active() {
        assert!(StageStatus::Pending.is_open());
        assert!(StageStatus::Active.is_open());
        assert!(!StageStatus::Completed.is_open());
        assert!(!StageStatus::Skipped.is_open());
    }
}
