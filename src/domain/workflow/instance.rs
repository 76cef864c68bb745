//! WorkflowInstance aggregate - multi-stage approval state machine.
//!
//! An instance owns its stage sequence and history outright; nothing
//! outside this type mutates them. The instance references the entity it
//! approves (tender, bid, contract, vendor) by id only; on rejection it
//! records the outcome and the engine routes the rejection intent to the
//! referent's own lifecycle controller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    Actor, DomainError, EntityRef, OrgId, StateMachine, Timestamp, WorkflowId,
};

use super::{
    HistoryEntry, Stage, StageDefinition, StageStatus, WorkflowAction, WorkflowEvent, WorkflowKind,
};

/// Overall status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for WorkflowStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, target),
            (Draft, InProgress) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use WorkflowStatus::*;
        match self {
            Draft => vec![InProgress],
            InProgress => vec![Completed, Cancelled],
            Completed => vec![],
            Cancelled => vec![],
        }
    }
}

/// The workflow aggregate root.
///
/// # Invariants
///
/// - The cursor, when present, is in `[0, stages.len()]`; `stages.len()`
///   only while status is completed.
/// - Exactly one stage is Active iff status is in_progress and the
///   cursor indexes a stage.
/// - History is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    id: WorkflowId,
    kind: WorkflowKind,
    org_id: OrgId,
    linked: EntityRef,
    stages: Vec<Stage>,
    /// `None` = not started; `Some(stages.len())` = past the last stage.
    cursor: Option<usize>,
    status: WorkflowStatus,
    history: Vec<HistoryEntry>,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(skip, default)]
    events: Vec<WorkflowEvent>,
}

impl WorkflowInstance {
    /// Creates a draft instance, stamping stages from their definitions.
    pub fn new(
        kind: WorkflowKind,
        org_id: OrgId,
        linked: EntityRef,
        definitions: &[StageDefinition],
    ) -> Self {
        let id = WorkflowId::new();
        let now = Timestamp::now();
        let mut instance = Self {
            id,
            kind,
            org_id,
            linked,
            stages: definitions.iter().map(Stage::from_definition).collect(),
            cursor: None,
            status: WorkflowStatus::Draft,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        instance.record_event(WorkflowEvent::Created {
            workflow_id: id,
            kind,
            linked,
        });
        instance
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the workflow ID.
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the workflow kind.
    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Returns the owning organization.
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Returns the linked entity reference.
    pub fn linked(&self) -> EntityRef {
        self.linked
    }

    /// Returns the overall status.
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Returns the stage sequence.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns a stage by name.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns the cursor (None = not started; stage count = finished).
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Returns the currently active stage, if any.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.cursor
            .and_then(|i| self.stages.get(i))
            .filter(|s| s.status == StageStatus::Active)
    }

    /// Returns the audit history.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Returns when the instance was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when the instance was last updated.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Takes accumulated domain events, clearing the internal buffer.
    pub fn take_events(&mut self) -> Vec<WorkflowEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────────────────────────────────────────────
    // Operations
    // ───────────────────────────────────────────────────────────────

    /// Starts the workflow: the first pending stage becomes active.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the instance is not a draft or has no
    ///   startable stage.
    pub fn start(&mut self, actor: &Actor) -> Result<(), DomainError> {
        if self.status != WorkflowStatus::Draft {
            return Err(DomainError::invalid_state(
                "Workflow",
                self.id,
                self.status,
                "start",
            ));
        }
        let Some(first) = self.next_pending_from(0) else {
            return Err(DomainError::invalid_state(
                "Workflow",
                self.id,
                "without startable stages",
                "start",
            ));
        };

        self.status = self
            .status
            .transition_to(WorkflowStatus::InProgress, "Workflow", self.id)?;
        self.activate_stage(first)?;
        self.cursor = Some(first);
        self.touch();

        let stage_name = self.stages[first].name.clone();
        self.push_history(actor, WorkflowAction::Started, None, self.cursor, None);
        self.record_event(WorkflowEvent::Started {
            workflow_id: self.id,
            stage: stage_name,
        });
        Ok(())
    }

    /// Signs off the active stage and moves to the next one, completing
    /// the workflow when no stage remains.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if no stage is currently active (including a
    ///   duplicate call after the workflow completed).
    /// - `Unauthorized` if the actor's role does not satisfy the stage's
    ///   required role.
    pub fn advance(&mut self, actor: &Actor, remarks: Option<String>) -> Result<(), DomainError> {
        self.sign_off(actor, remarks, WorkflowAction::Advanced)
    }

    /// Approves the active stage. Same mechanics as [`advance`], recorded
    /// as an approval in the history.
    ///
    /// [`advance`]: WorkflowInstance::advance
    pub fn approve(&mut self, actor: &Actor, remarks: Option<String>) -> Result<(), DomainError> {
        self.sign_off(actor, remarks, WorkflowAction::Approved)
    }

    /// Rejects the active stage and freezes the workflow.
    ///
    /// The instance is cancelled and accepts no further advance or
    /// revert. The engine routes the rejection to the linked entity's
    /// own lifecycle controller.
    pub fn reject(&mut self, actor: &Actor, remarks: Option<String>) -> Result<(), DomainError> {
        let current = self.require_active_stage("reject")?;
        self.require_stage_role(current, actor)?;

        let now = Timestamp::now();
        let stage = &mut self.stages[current];
        stage.status = stage
            .status
            .transition_to(StageStatus::Completed, "Stage", &stage.name)?;
        stage.completed_at = Some(now);
        stage.notes = remarks.clone();
        let stage_name = stage.name.clone();

        self.status = self
            .status
            .transition_to(WorkflowStatus::Cancelled, "Workflow", self.id)?;
        self.touch();

        self.push_history(
            actor,
            WorkflowAction::Rejected,
            Some(current),
            Some(current),
            remarks.clone(),
        );
        self.record_event(WorkflowEvent::Rejected {
            workflow_id: self.id,
            stage: stage_name,
            remarks,
        });
        Ok(())
    }

    /// Reopens the previous stage; the active stage returns to pending.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if no stage is active or there is no earlier
    ///   stage to reopen.
    /// - `Unauthorized` if the actor's role does not satisfy the active
    ///   stage's required role.
    pub fn revert(&mut self, actor: &Actor, remarks: Option<String>) -> Result<(), DomainError> {
        let current = self.require_active_stage("revert")?;
        self.require_stage_role(current, actor)?;

        let Some(previous) = self.prev_completed_from(current) else {
            return Err(DomainError::invalid_state(
                "Workflow",
                self.id,
                "at the first stage",
                "revert",
            ));
        };

        let stage = &mut self.stages[current];
        stage.status = stage
            .status
            .transition_to(StageStatus::Pending, "Stage", &stage.name)?;
        stage.started_at = None;

        let reopened = &mut self.stages[previous];
        reopened.status = reopened
            .status
            .transition_to(StageStatus::Active, "Stage", &reopened.name)?;
        reopened.started_at = Some(Timestamp::now());
        reopened.completed_at = None;
        let reopened_name = reopened.name.clone();

        self.cursor = Some(previous);
        self.touch();

        self.push_history(
            actor,
            WorkflowAction::Reverted,
            Some(current),
            Some(previous),
            remarks,
        );
        self.record_event(WorkflowEvent::StageReverted {
            workflow_id: self.id,
            reopened_stage: reopened_name,
        });
        Ok(())
    }

    /// Sets the assignee of a stage, regardless of its activation state.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless the actor has administrative capability.
    /// - `NotFound` if no stage carries the given name.
    pub fn assign(
        &mut self,
        stage_name: &str,
        assignee: crate::domain::foundation::ActorId,
        actor: &Actor,
    ) -> Result<(), DomainError> {
        if !actor.role.is_admin() {
            return Err(DomainError::unauthorized(
                "Workflow",
                self.id,
                "admin",
                actor.role,
            ));
        }
        let index = self
            .stage_index(stage_name)
            .ok_or_else(|| DomainError::not_found("Stage", stage_name))?;

        self.stages[index].assignee = Some(assignee.clone());
        self.touch();

        self.push_history(actor, WorkflowAction::Assigned, self.cursor, self.cursor, None);
        self.record_event(WorkflowEvent::StageAssigned {
            workflow_id: self.id,
            stage: self.stages[index].name.clone(),
            assignee,
        });
        Ok(())
    }

    /// Flags the active stage for priority handling.
    ///
    /// The cursor does not move; the event widens the notification
    /// audience to the owning organization.
    pub fn escalate(&mut self, actor: &Actor, remarks: Option<String>) -> Result<(), DomainError> {
        let current = self.require_active_stage("escalate")?;
        self.require_stage_role(current, actor)?;

        self.stages[current].escalated = true;
        let stage_name = self.stages[current].name.clone();
        self.touch();

        self.push_history(
            actor,
            WorkflowAction::Escalated,
            Some(current),
            Some(current),
            remarks,
        );
        self.record_event(WorkflowEvent::StageEscalated {
            workflow_id: self.id,
            stage: stage_name,
        });
        Ok(())
    }

    /// Marks a pending stage skipped; advance and revert step over it.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless the actor has administrative capability.
    /// - `NotFound` if no stage carries the given name.
    /// - `InvalidTransition` if the stage is not pending.
    pub fn skip(
        &mut self,
        stage_name: &str,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<(), DomainError> {
        if !actor.role.is_admin() {
            return Err(DomainError::unauthorized(
                "Workflow",
                self.id,
                "admin",
                actor.role,
            ));
        }
        let index = self
            .stage_index(stage_name)
            .ok_or_else(|| DomainError::not_found("Stage", stage_name))?;

        let stage = &mut self.stages[index];
        stage.status = stage
            .status
            .transition_to(StageStatus::Skipped, "Stage", &stage.name)?;
        stage.notes = remarks.clone();
        let stage_name = stage.name.clone();
        self.touch();

        self.push_history(actor, WorkflowAction::Skipped, self.cursor, self.cursor, remarks);
        self.record_event(WorkflowEvent::StageSkipped {
            workflow_id: self.id,
            stage: stage_name,
        });
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    fn sign_off(
        &mut self,
        actor: &Actor,
        remarks: Option<String>,
        action: WorkflowAction,
    ) -> Result<(), DomainError> {
        let current = self.require_active_stage("advance")?;
        self.require_stage_role(current, actor)?;

        let now = Timestamp::now();
        let stage = &mut self.stages[current];
        stage.status = stage
            .status
            .transition_to(StageStatus::Completed, "Stage", &stage.name)?;
        stage.completed_at = Some(now);
        stage.notes = remarks.clone();
        let completed_name = stage.name.clone();

        let activated_name = match self.next_pending_from(current + 1) {
            Some(next) => {
                self.activate_stage(next)?;
                self.cursor = Some(next);
                Some(self.stages[next].name.clone())
            }
            None => {
                self.cursor = Some(self.stages.len());
                self.status = self
                    .status
                    .transition_to(WorkflowStatus::Completed, "Workflow", self.id)?;
                None
            }
        };
        self.touch();

        self.push_history(actor, action, Some(current), self.cursor, remarks);
        self.record_event(WorkflowEvent::StageAdvanced {
            workflow_id: self.id,
            completed_stage: completed_name,
            activated_stage: activated_name.clone(),
        });
        if activated_name.is_none() {
            self.record_event(WorkflowEvent::Completed {
                workflow_id: self.id,
            });
        }
        Ok(())
    }

    /// Index of the active stage, or `InvalidState` naming the attempted
    /// operation.
    fn require_active_stage(&self, attempted: &'static str) -> Result<usize, DomainError> {
        if self.status != WorkflowStatus::InProgress {
            return Err(DomainError::invalid_state(
                "Workflow",
                self.id,
                self.status,
                attempted,
            ));
        }
        self.cursor
            .filter(|&i| {
                self.stages
                    .get(i)
                    .map(|s| s.status == StageStatus::Active)
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                DomainError::invalid_state("Workflow", self.id, "without an active stage", attempted)
            })
    }

    fn require_stage_role(&self, index: usize, actor: &Actor) -> Result<(), DomainError> {
        let stage = &self.stages[index];
        if actor.role.satisfies(&stage.required_role) {
            Ok(())
        } else {
            Err(
                DomainError::unauthorized("Workflow", self.id, stage.required_role, actor.role)
                    .with_detail("stage", stage.name.clone()),
            )
        }
    }

    fn activate_stage(&mut self, index: usize) -> Result<(), DomainError> {
        let stage = &mut self.stages[index];
        stage.status = stage
            .status
            .transition_to(StageStatus::Active, "Stage", &stage.name)?;
        stage.started_at = Some(Timestamp::now());
        Ok(())
    }

    /// First pending stage at or after `from`, stepping over skipped ones.
    fn next_pending_from(&self, from: usize) -> Option<usize> {
        (from..self.stages.len()).find(|&i| self.stages[i].status == StageStatus::Pending)
    }

    /// Nearest completed stage before `current`, stepping over skipped ones.
    fn prev_completed_from(&self, current: usize) -> Option<usize> {
        (0..current).rev().find(|&i| self.stages[i].status == StageStatus::Completed)
    }

    fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    fn push_history(
        &mut self,
        actor: &Actor,
        action: WorkflowAction,
        from_index: Option<usize>,
        to_index: Option<usize>,
        remarks: Option<String>,
    ) {
        self.history.push(HistoryEntry {
            actor: actor.id.clone(),
            role: actor.role,
            action,
            from_index,
            to_index,
            at: Timestamp::now(),
            remarks,
        });
    }

    fn record_event(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ActorId, ActorRole, EntityKind, ErrorCode, TenderId};

    fn actor(role: ActorRole) -> Actor {
        Actor::new(ActorId::new(format!("{}-1", role)).unwrap(), role)
    }

    fn two_stage_instance() -> WorkflowInstance {
        WorkflowInstance::new(
            WorkflowKind::TenderApproval,
            OrgId::new(),
            EntityRef::tender(TenderId::new()),
            &[
                StageDefinition::new("Draft-Review", ActorRole::Officer, 3),
                StageDefinition::new("Final-Approval", ActorRole::Approver, 2),
            ],
        )
    }

    /// Cursor within bounds; exactly one active stage iff in progress.
    fn assert_invariants(wf: &WorkflowInstance) {
        if let Some(i) = wf.cursor() {
            assert!(i <= wf.stages().len());
            if i == wf.stages().len() {
                assert_eq!(wf.status(), WorkflowStatus::Completed);
            }
        }
        let active_count = wf
            .stages()
            .iter()
            .filter(|s| s.status == StageStatus::Active)
            .count();
        let expects_active = wf.status() == WorkflowStatus::InProgress
            && wf.cursor().map(|i| i < wf.stages().len()).unwrap_or(false);
        assert_eq!(active_count, usize::from(expects_active));
    }

    #[test]
    fn new_instance_is_an_unstarted_draft() {
        let mut wf = two_stage_instance();
        assert_eq!(wf.status(), WorkflowStatus::Draft);
        assert_eq!(wf.cursor(), None);
        assert!(wf.current_stage().is_none());
        assert_invariants(&wf);

        let events = wf.take_events();
        assert!(matches!(events[0], WorkflowEvent::Created { .. }));
    }

    #[test]
    fn start_activates_first_stage() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();

        assert_eq!(wf.status(), WorkflowStatus::InProgress);
        assert_eq!(wf.cursor(), Some(0));
        assert_eq!(wf.current_stage().unwrap().name, "Draft-Review");
        assert_invariants(&wf);
    }

    #[test]
    fn start_twice_fails_with_invalid_state() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        let err = wf.start(&actor(ActorRole::Officer)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn start_with_no_stages_fails_with_invalid_state() {
        let mut wf = WorkflowInstance::new(
            WorkflowKind::TenderApproval,
            OrgId::new(),
            EntityRef::tender(TenderId::new()),
            &[],
        );
        let err = wf.start(&actor(ActorRole::Admin)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn full_run_through_both_stages() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();

        wf.advance(&actor(ActorRole::Officer), None).unwrap();
        assert_eq!(wf.cursor(), Some(1));
        assert_eq!(wf.stages()[0].status, StageStatus::Completed);
        assert_eq!(wf.current_stage().unwrap().name, "Final-Approval");
        assert_invariants(&wf);

        wf.advance(&actor(ActorRole::Approver), None).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Completed);
        assert_eq!(wf.cursor(), Some(2));
        assert!(wf.current_stage().is_none());
        assert_invariants(&wf);
    }

    #[test]
    fn advance_after_completion_fails_with_invalid_state() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.advance(&actor(ActorRole::Officer), None).unwrap();
        wf.advance(&actor(ActorRole::Approver), None).unwrap();

        let err = wf.advance(&actor(ActorRole::Approver), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn advance_with_wrong_role_fails_unauthorized() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();

        let err = wf.advance(&actor(ActorRole::Bidder), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.details.get("required_role"), Some(&"officer".to_string()));
    }

    #[test]
    fn admin_satisfies_any_stage_role() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Admin)).unwrap();
        wf.advance(&actor(ActorRole::Admin), None).unwrap();
        wf.advance(&actor(ActorRole::Admin), None).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Completed);
    }

    #[test]
    fn advance_then_revert_restores_stage_statuses_but_history_grows() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        let before_statuses: Vec<_> = wf.stages().iter().map(|s| s.status).collect();
        let before_cursor = wf.cursor();
        let history_before = wf.history().len();

        wf.advance(&actor(ActorRole::Officer), None).unwrap();
        wf.revert(&actor(ActorRole::Approver), Some("rework".to_string()))
            .unwrap();

        let after_statuses: Vec<_> = wf.stages().iter().map(|s| s.status).collect();
        assert_eq!(after_statuses, before_statuses);
        assert_eq!(wf.cursor(), before_cursor);
        assert_eq!(wf.history().len(), history_before + 2);
        assert_invariants(&wf);
    }

    #[test]
    fn revert_at_first_stage_fails_with_invalid_state() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();

        let err = wf.revert(&actor(ActorRole::Officer), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn reject_freezes_the_workflow() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.reject(&actor(ActorRole::Officer), Some("not viable".to_string()))
            .unwrap();

        assert_eq!(wf.status(), WorkflowStatus::Cancelled);

        let err = wf.advance(&actor(ActorRole::Admin), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        let err = wf.revert(&actor(ActorRole::Admin), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert_invariants(&wf);
    }

    #[test]
    fn approve_records_approval_in_history() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.approve(&actor(ActorRole::Officer), Some("ok".to_string()))
            .unwrap();

        let last = wf.history().last().unwrap();
        assert_eq!(last.action, WorkflowAction::Approved);
        assert_eq!(last.from_index, Some(0));
        assert_eq!(last.to_index, Some(1));
    }

    #[test]
    fn assign_targets_any_stage_and_requires_admin() {
        let mut wf = two_stage_instance();
        let assignee = ActorId::new("approver-7").unwrap();

        // Pending stage, workflow not even started
        wf.assign("Final-Approval", assignee.clone(), &actor(ActorRole::Admin))
            .unwrap();
        assert_eq!(wf.stage("Final-Approval").unwrap().assignee, Some(assignee));

        let err = wf
            .assign(
                "Draft-Review",
                ActorId::new("x").unwrap(),
                &actor(ActorRole::Officer),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn assign_unknown_stage_fails_not_found() {
        let mut wf = two_stage_instance();
        let err = wf
            .assign("No-Such-Stage", ActorId::new("x").unwrap(), &actor(ActorRole::Admin))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn escalate_flags_stage_without_moving_cursor() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.escalate(&actor(ActorRole::Officer), Some("overdue".to_string()))
            .unwrap();

        assert_eq!(wf.cursor(), Some(0));
        assert!(wf.stages()[0].escalated);
        assert_eq!(wf.history().last().unwrap().action, WorkflowAction::Escalated);

        let events = wf.take_events();
        assert!(events.iter().any(|e| e.is_escalation()));
    }

    #[test]
    fn skip_steps_over_a_pending_stage_on_advance() {
        let mut wf = WorkflowInstance::new(
            WorkflowKind::TenderApproval,
            OrgId::new(),
            EntityRef::tender(TenderId::new()),
            &[
                StageDefinition::new("One", ActorRole::Officer, 1),
                StageDefinition::new("Two", ActorRole::Evaluator, 1),
                StageDefinition::new("Three", ActorRole::Approver, 1),
            ],
        );
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.skip("Two", &actor(ActorRole::Admin), None).unwrap();

        wf.advance(&actor(ActorRole::Officer), None).unwrap();
        assert_eq!(wf.current_stage().unwrap().name, "Three");
        assert_invariants(&wf);

        // Revert steps back over the skipped stage too
        wf.revert(&actor(ActorRole::Approver), None).unwrap();
        assert_eq!(wf.current_stage().unwrap().name, "One");
        assert_invariants(&wf);
    }

    #[test]
    fn skip_rejects_non_pending_stages() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();

        let err = wf.skip("Draft-Review", &actor(ActorRole::Admin), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn history_is_append_only_across_operations() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        let first = wf.history()[0].clone();

        wf.advance(&actor(ActorRole::Officer), None).unwrap();
        wf.revert(&actor(ActorRole::Approver), None).unwrap();
        wf.advance(&actor(ActorRole::Officer), None).unwrap();

        assert_eq!(wf.history()[0], first);
        assert_eq!(wf.history().len(), 4);
    }

    #[test]
    fn serde_round_trip_preserves_state_and_drops_event_buffer() {
        let mut wf = two_stage_instance();
        wf.start(&actor(ActorRole::Officer)).unwrap();
        wf.advance(&actor(ActorRole::Officer), Some("fine".to_string()))
            .unwrap();

        let json = serde_json::to_string(&wf).unwrap();
        let mut back: WorkflowInstance = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id(), wf.id());
        assert_eq!(back.status(), wf.status());
        assert_eq!(back.cursor(), wf.cursor());
        assert_eq!(back.history().len(), wf.history().len());
        assert!(back.take_events().is_empty());
    }
}
