//! Acting principal and role types.
//!
//! These types represent an authenticated principal extracted upstream
//! (JWT middleware, service token). They have no provider dependencies;
//! any identity layer can populate them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ActorId;

/// Platform role of an acting principal.
///
/// Roles are flat: an operation names the role it requires, and only
/// `Admin` may act in place of any other role. There is no partial
/// ordering between the approval roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Vendor submitting bids against tenders.
    Bidder,
    /// Procurement officer handling day-to-day stage work.
    Officer,
    /// Bid evaluator scoring and shortlisting.
    Evaluator,
    /// Final approver for workflow stages.
    Approver,
    /// Platform administrator with override capability.
    Admin,
}

impl ActorRole {
    /// True when an actor with this role may act where `required` is
    /// demanded: either the exact role, or `Admin`.
    pub fn satisfies(&self, required: &ActorRole) -> bool {
        self == required || matches!(self, ActorRole::Admin)
    }

    /// True for roles allowed to run evaluation actions on bids.
    pub fn can_evaluate(&self) -> bool {
        matches!(
            self,
            ActorRole::Evaluator | ActorRole::Approver | ActorRole::Admin
        )
    }

    /// True for the administrative capability (assignment, skipping).
    pub fn is_admin(&self) -> bool {
        matches!(self, ActorRole::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActorRole::Bidder => "bidder",
            ActorRole::Officer => "officer",
            ActorRole::Evaluator => "evaluator",
            ActorRole::Approver => "approver",
            ActorRole::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// An authenticated principal acting on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Provider-issued subject identifier.
    pub id: ActorId,
    /// Role granted to the principal for this request.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor from its parts.
    pub fn new(id: ActorId, role: ActorRole) -> Self {
        Self { id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_role_satisfies_itself() {
        assert!(ActorRole::Officer.satisfies(&ActorRole::Officer));
        assert!(ActorRole::Approver.satisfies(&ActorRole::Approver));
    }

    #[test]
    fn admin_satisfies_everything() {
        for required in [
            ActorRole::Bidder,
            ActorRole::Officer,
            ActorRole::Evaluator,
            ActorRole::Approver,
            ActorRole::Admin,
        ] {
            assert!(ActorRole::Admin.satisfies(&required));
        }
    }

    #[test]
    fn approval_roles_do_not_cross_satisfy() {
        assert!(!ActorRole::Officer.satisfies(&ActorRole::Approver));
        assert!(!ActorRole::Approver.satisfies(&ActorRole::Officer));
        assert!(!ActorRole::Evaluator.satisfies(&ActorRole::Approver));
        assert!(!ActorRole::Bidder.satisfies(&ActorRole::Officer));
    }

    #[test]
    fn evaluation_capability_covers_expected_roles() {
        assert!(ActorRole::Evaluator.can_evaluate());
        assert!(ActorRole::Approver.can_evaluate());
        assert!(ActorRole::Admin.can_evaluate());
        assert!(!ActorRole::Officer.can_evaluate());
        assert!(!ActorRole::Bidder.can_evaluate());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ActorRole::Evaluator).unwrap(),
            "\"evaluator\""
        );
    }
}
