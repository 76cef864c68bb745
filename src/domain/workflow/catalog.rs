//! Static catalog of stage definitions per workflow kind.
//!
//! The catalog is the template a new workflow instance is stamped from:
//! each kind carries an ordered list of named stages with the role that
//! must sign off and a planned duration. Deployments may replace the
//! stage list for a kind at startup; instances snapshot their stages at
//! creation, so later catalog edits never affect running workflows.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::foundation::ActorRole;

/// Kind tag selecting the stage template for a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Approval of a tender before publication.
    TenderApproval,
    /// Approval of a drafted contract.
    ContractApproval,
    /// Verification of a vendor's registration documents.
    VendorVerification,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowKind::TenderApproval => "tender_approval",
            WorkflowKind::ContractApproval => "contract_approval",
            WorkflowKind::VendorVerification => "vendor_verification",
        };
        write!(f, "{}", s)
    }
}

/// Template for one stage of a workflow kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage name, unique within its workflow kind.
    pub name: String,
    /// Role that must sign this stage off.
    pub required_role: ActorRole,
    /// Planned duration before the stage is considered overdue.
    pub duration_days: u32,
}

impl StageDefinition {
    /// Creates a stage definition.
    pub fn new(name: impl Into<String>, required_role: ActorRole, duration_days: u32) -> Self {
        Self {
            name: name.into(),
            required_role,
            duration_days,
        }
    }
}

/// Catalog mapping workflow kinds to their stage templates.
pub struct StageCatalog {
    stages: HashMap<WorkflowKind, Vec<StageDefinition>>,
}

impl StageCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
        }
    }

    /// Replaces the stage template for a kind.
    pub fn register(&mut self, kind: WorkflowKind, stages: Vec<StageDefinition>) {
        self.stages.insert(kind, stages);
    }

    /// Returns the stage template for a kind, if registered.
    pub fn stages_for(&self, kind: WorkflowKind) -> Option<&[StageDefinition]> {
        self.stages.get(&kind).map(|s| s.as_slice())
    }

    /// Returns the built-in catalog shared by the platform.
    pub fn builtin() -> &'static StageCatalog {
        &BUILTIN
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            WorkflowKind::TenderApproval,
            vec![
                StageDefinition::new("Draft-Review", ActorRole::Officer, 3),
                StageDefinition::new("Technical-Scrutiny", ActorRole::Evaluator, 5),
                StageDefinition::new("Final-Approval", ActorRole::Approver, 2),
            ],
        );
        catalog.register(
            WorkflowKind::ContractApproval,
            vec![
                StageDefinition::new("Legal-Review", ActorRole::Officer, 5),
                StageDefinition::new("Financial-Review", ActorRole::Evaluator, 3),
                StageDefinition::new("Signature", ActorRole::Approver, 2),
            ],
        );
        catalog.register(
            WorkflowKind::VendorVerification,
            vec![
                StageDefinition::new("Document-Check", ActorRole::Officer, 2),
                StageDefinition::new("Verification-Signoff", ActorRole::Approver, 1),
            ],
        );
        catalog
    }
}

static BUILTIN: Lazy<StageCatalog> = Lazy::new(StageCatalog::default);
