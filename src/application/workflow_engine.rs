//! WorkflowEngine service - drives approval workflow instances.
//!
//! Concurrency: operations on one instance serialize through the record
//! store's version check; the loser of a race receives `Conflict` and
//! retries against a fresh read. The engine performs no implicit merge
//! and holds no locks, so operations on different instances proceed
//! fully in parallel.

use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::domain::foundation::{
    Actor, ActorId, BidId, DomainError, EntityKind, EntityRef, Notification, OrgId, Topic,
    WorkflowId,
};
use crate::domain::workflow::{StageCatalog, WorkflowEvent, WorkflowInstance, WorkflowKind};
use crate::ports::{RecordStore, Versioned, WorkflowStore};

use super::BidLifecycle;

/// Drives workflow instances through their stages and fans transitions
/// out to subscribers.
pub struct WorkflowEngine {
    workflows: Arc<dyn WorkflowStore>,
    bids: Arc<BidLifecycle>,
    catalog: Arc<StageCatalog>,
    dispatcher: Arc<EventDispatcher>,
}

impl WorkflowEngine {
    /// Creates the engine over its ports and collaborating controllers.
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        bids: Arc<BidLifecycle>,
        catalog: Arc<StageCatalog>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            workflows,
            bids,
            catalog,
            dispatcher,
        }
    }

    /// Creates a draft workflow for an entity entering an approvable
    /// state, stamping stages from the catalog template for `kind`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no stage template is registered for the kind.
    pub async fn create(
        &self,
        kind: WorkflowKind,
        org_id: OrgId,
        linked: EntityRef,
    ) -> Result<WorkflowInstance, DomainError> {
        let definitions = self
            .catalog
            .stages_for(kind)
            .ok_or_else(|| DomainError::not_found("StageTemplate", kind))?;

        let mut workflow = WorkflowInstance::new(kind, org_id, linked, definitions);
        let events = workflow.take_events();
        self.workflows.insert(&workflow.id(), &workflow).await?;
        self.dispatcher
            .dispatch_detached(self.notifications_for(&workflow, events));
        Ok(workflow)
    }

    /// Starts a draft workflow; its first stage becomes active.
    pub async fn start(&self, id: WorkflowId, actor: &Actor) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.start(actor)).await
    }

    /// Signs off the active stage and activates the next one.
    pub async fn advance(
        &self,
        id: WorkflowId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.advance(actor, remarks)).await
    }

    /// Approves the active stage (same mechanics as advance, recorded as
    /// an approval).
    pub async fn approve(
        &self,
        id: WorkflowId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.approve(actor, remarks)).await
    }

    /// Reopens the previous stage.
    pub async fn revert(
        &self,
        id: WorkflowId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.revert(actor, remarks)).await
    }

    /// Rejects the active stage, freezing the workflow, and routes the
    /// rejection to the linked entity's own lifecycle controller.
    ///
    /// The workflow commit happens first; if the linked-entity cascade
    /// then fails, the error surfaces to the caller while the workflow
    /// stays cancelled (its notifications still go out). Kinds without
    /// an in-core controller are covered by the rejection notification
    /// on their own topic.
    pub async fn reject(
        &self,
        id: WorkflowId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        let Versioned {
            record: mut workflow,
            version,
        } = self.load(id).await?;

        workflow.reject(actor, remarks.clone())?;

        let events = workflow.take_events();
        self.workflows.save(&id, &workflow, version).await?;
        let notifications = self.notifications_for(&workflow, events);

        let cascade = self.cascade_rejection(&workflow, actor, remarks).await;
        self.dispatcher.dispatch_detached(notifications);
        cascade?;

        Ok(workflow)
    }

    /// Sets the assignee of a named stage (admin only, any stage state).
    pub async fn assign(
        &self,
        id: WorkflowId,
        stage_name: &str,
        assignee: ActorId,
        actor: &Actor,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.assign(stage_name, assignee, actor)).await
    }

    /// Flags the active stage for priority handling; the notification
    /// also reaches the owning organization's channel.
    pub async fn escalate(
        &self,
        id: WorkflowId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.escalate(actor, remarks)).await
    }

    /// Marks a pending stage skipped (admin only).
    pub async fn skip(
        &self,
        id: WorkflowId,
        stage_name: &str,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<WorkflowInstance, DomainError> {
        self.mutate(id, |wf| wf.skip(stage_name, actor, remarks)).await
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    async fn mutate<F>(&self, id: WorkflowId, op: F) -> Result<WorkflowInstance, DomainError>
    where
        F: FnOnce(&mut WorkflowInstance) -> Result<(), DomainError> + Send,
    {
        let Versioned {
            record: mut workflow,
            version,
        } = self.load(id).await?;

        op(&mut workflow)?;

        let events = workflow.take_events();
        self.workflows.save(&id, &workflow, version).await?;
        self.dispatcher
            .dispatch_detached(self.notifications_for(&workflow, events));
        Ok(workflow)
    }

    async fn load(&self, id: WorkflowId) -> Result<Versioned<WorkflowInstance>, DomainError> {
        self.workflows
            .load(&id)
            .await?
            .ok_or_else(|| DomainError::not_found("Workflow", id))
    }

    /// Applies the rejection to the linked entity through its own
    /// controller, preserving single-writer-per-aggregate discipline.
    async fn cascade_rejection(
        &self,
        workflow: &WorkflowInstance,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<(), DomainError> {
        let linked = workflow.linked();
        match linked.kind {
            EntityKind::Bid => {
                let reason =
                    remarks.unwrap_or_else(|| "rejected by approval workflow".to_string());
                self.bids
                    .reject(BidId::from_uuid(linked.id), actor, reason)
                    .await
                    .map_err(|err| {
                        err.with_detail(
                            "cascade",
                            "workflow rejection recorded; linked bid rejection failed",
                        )
                    })?;
            }
            // Tender, contract, and vendor records are maintained by
            // upstream CRUD; the rejection notification on their topic
            // carries the intent.
            _ => {}
        }
        Ok(())
    }

    /// Each workflow event is announced on the workflow's channel and on
    /// the linked entity's channel; escalations additionally reach the
    /// owning organization.
    fn notifications_for(
        &self,
        workflow: &WorkflowInstance,
        events: Vec<WorkflowEvent>,
    ) -> Vec<Notification> {
        let mut notifications = Vec::with_capacity(events.len() * 2);
        for event in events {
            let base = Notification::new(
                Topic::Workflow(workflow.id()),
                event.event_type(),
                event.workflow_id(),
                event.payload(),
            );
            if let Some(linked_topic) = Topic::for_entity(&workflow.linked()) {
                notifications.push(base.readdressed(linked_topic));
            }
            if event.is_escalation() {
                notifications.push(base.readdressed(Topic::Org(workflow.org_id())));
            }
            notifications.push(base);
        }
        notifications
    }
}
