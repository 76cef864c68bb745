//! Domain events recorded by the workflow aggregate.

use serde_json::{json, Value as JsonValue};

use crate::domain::foundation::{ActorId, EntityRef, WorkflowId};

use super::WorkflowKind;

/// Events emitted by `WorkflowInstance` mutations.
///
/// The aggregate buffers these; the engine drains them after a
/// successful save and turns them into topic-addressed notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Created {
        workflow_id: WorkflowId,
        kind: WorkflowKind,
        linked: EntityRef,
    },
    Started {
        workflow_id: WorkflowId,
        stage: String,
    },
    StageAdvanced {
        workflow_id: WorkflowId,
        completed_stage: String,
        activated_stage: Option<String>,
    },
    StageReverted {
        workflow_id: WorkflowId,
        reopened_stage: String,
    },
    Completed {
        workflow_id: WorkflowId,
    },
    Rejected {
        workflow_id: WorkflowId,
        stage: String,
        remarks: Option<String>,
    },
    StageAssigned {
        workflow_id: WorkflowId,
        stage: String,
        assignee: ActorId,
    },
    StageEscalated {
        workflow_id: WorkflowId,
        stage: String,
    },
    StageSkipped {
        workflow_id: WorkflowId,
        stage: String,
    },
}

impl WorkflowEvent {
    /// Event type string used for client-side routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::Created { .. } => "workflow.created",
            WorkflowEvent::Started { .. } => "workflow.started",
            WorkflowEvent::StageAdvanced { .. } => "workflow.advanced",
            WorkflowEvent::StageReverted { .. } => "workflow.reverted",
            WorkflowEvent::Completed { .. } => "workflow.completed",
            WorkflowEvent::Rejected { .. } => "workflow.rejected",
            WorkflowEvent::StageAssigned { .. } => "workflow.stage_assigned",
            WorkflowEvent::StageEscalated { .. } => "workflow.escalated",
            WorkflowEvent::StageSkipped { .. } => "workflow.stage_skipped",
        }
    }

    /// The workflow the event concerns.
    pub fn workflow_id(&self) -> WorkflowId {
        match self {
            WorkflowEvent::Created { workflow_id, .. }
            | WorkflowEvent::Started { workflow_id, .. }
            | WorkflowEvent::StageAdvanced { workflow_id, .. }
            | WorkflowEvent::StageReverted { workflow_id, .. }
            | WorkflowEvent::Completed { workflow_id }
            | WorkflowEvent::Rejected { workflow_id, .. }
            | WorkflowEvent::StageAssigned { workflow_id, .. }
            | WorkflowEvent::StageEscalated { workflow_id, .. }
            | WorkflowEvent::StageSkipped { workflow_id, .. } => *workflow_id,
        }
    }

    /// True for events that should also reach the owning organization's
    /// channel (supervisory audience).
    pub fn is_escalation(&self) -> bool {
        matches!(self, WorkflowEvent::StageEscalated { .. })
    }

    /// Notification payload for this event.
    pub fn payload(&self) -> JsonValue {
        match self {
            WorkflowEvent::Created {
                workflow_id,
                kind,
                linked,
            } => json!({
                "workflow_id": workflow_id,
                "kind": kind,
                "linked_entity": linked,
            }),
            WorkflowEvent::Started { workflow_id, stage } => json!({
                "workflow_id": workflow_id,
                "stage": stage,
            }),
            WorkflowEvent::StageAdvanced {
                workflow_id,
                completed_stage,
                activated_stage,
            } => json!({
                "workflow_id": workflow_id,
                "completed_stage": completed_stage,
                "activated_stage": activated_stage,
            }),
            WorkflowEvent::StageReverted {
                workflow_id,
                reopened_stage,
            } => json!({
                "workflow_id": workflow_id,
                "reopened_stage": reopened_stage,
            }),
            WorkflowEvent::Completed { workflow_id } => json!({
                "workflow_id": workflow_id,
            }),
            WorkflowEvent::Rejected {
                workflow_id,
                stage,
                remarks,
            } => json!({
                "workflow_id": workflow_id,
                "stage": stage,
                "remarks": remarks,
            }),
            WorkflowEvent::StageAssigned {
                workflow_id,
                stage,
                assignee,
            } => json!({
                "workflow_id": workflow_id,
                "stage": stage,
                "assignee": assignee,
            }),
            WorkflowEvent::StageEscalated { workflow_id, stage } => json!({
                "workflow_id": workflow_id,
                "stage": stage,
            }),
            WorkflowEvent::StageSkipped { workflow_id, stage } => json!({
                "workflow_id": workflow_id,
                "stage": stage,
            }),
        }
    }
}
