//! Tender read model consumed for bid-submission preconditions.
//!
//! Tender CRUD lives outside the core; the lifecycle controllers only
//! need to know whether a tender accepts bids and what deposit it
//! mandates, so they read this snapshot through the `TenderReader` port.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, OrgId, TenderId};

/// Earnest-money requirement attached to a tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmdPolicy {
    /// Minimum deposit amount a bid must carry.
    pub floor: Money,
}

/// Read-only view of a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderSnapshot {
    pub id: TenderId,
    pub org_id: OrgId,
    /// True while the tender accepts submissions.
    pub open: bool,
    /// Deposit requirement; `None` when the tender mandates no EMD.
    pub emd_policy: Option<EmdPolicy>,
}

impl TenderSnapshot {
    /// True while the tender accepts submissions.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True when bids against this tender must carry an active EMD.
    pub fn requires_emd(&self) -> bool {
        self.emd_policy.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    #[test]
    fn requires_emd_follows_policy() {
        let open = TenderSnapshot {
            id: TenderId::new(),
            org_id: OrgId::new(),
            open: true,
            emd_policy: None,
        };
        assert!(open.is_open());
        assert!(!open.requires_emd());

        let with_policy = TenderSnapshot {
            emd_policy: Some(EmdPolicy {
                floor: Money::new(50_000, Currency::INR).unwrap(),
            }),
            ..open
        };
        assert!(with_policy.requires_emd());
    }
}
