//! Domain events recorded by the EMD aggregate.

use serde_json::{json, Value as JsonValue};

use crate::domain::foundation::{BidId, EmdId, TenderId};

/// Events emitted by `Emd` mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmdEvent {
    Registered {
        emd_id: EmdId,
        tender_id: TenderId,
    },
    BidLinked {
        emd_id: EmdId,
        bid_id: BidId,
    },
    Verified {
        emd_id: EmdId,
        remarks: Option<String>,
    },
    Refunded {
        emd_id: EmdId,
        reason: String,
    },
    Forfeited {
        emd_id: EmdId,
        reason: String,
    },
    Expired {
        emd_id: EmdId,
    },
}

impl EmdEvent {
    /// Event type string used for client-side routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            EmdEvent::Registered { .. } => "emd.registered",
            EmdEvent::BidLinked { .. } => "emd.bid_linked",
            EmdEvent::Verified { .. } => "emd.verified",
            EmdEvent::Refunded { .. } => "emd.refunded",
            EmdEvent::Forfeited { .. } => "emd.forfeited",
            EmdEvent::Expired { .. } => "emd.expired",
        }
    }

    /// The deposit the event concerns.
    pub fn emd_id(&self) -> EmdId {
        match self {
            EmdEvent::Registered { emd_id, .. }
            | EmdEvent::BidLinked { emd_id, .. }
            | EmdEvent::Verified { emd_id, .. }
            | EmdEvent::Refunded { emd_id, .. }
            | EmdEvent::Forfeited { emd_id, .. }
            | EmdEvent::Expired { emd_id } => *emd_id,
        }
    }

    /// Notification payload for this event.
    pub fn payload(&self) -> JsonValue {
        match self {
            EmdEvent::Registered { emd_id, tender_id } => json!({
                "emd_id": emd_id,
                "tender_id": tender_id,
            }),
            EmdEvent::BidLinked { emd_id, bid_id } => json!({
                "emd_id": emd_id,
                "bid_id": bid_id,
            }),
            EmdEvent::Verified { emd_id, remarks } => json!({
                "emd_id": emd_id,
                "remarks": remarks,
            }),
            EmdEvent::Refunded { emd_id, reason } => json!({
                "emd_id": emd_id,
                "reason": reason,
            }),
            EmdEvent::Forfeited { emd_id, reason } => json!({
                "emd_id": emd_id,
                "reason": reason,
            }),
            EmdEvent::Expired { emd_id } => json!({
                "emd_id": emd_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_namespaced() {
        let event = EmdEvent::Expired { emd_id: EmdId::new() };
        assert_eq!(event.event_type(), "emd.expired");
    }

    #[test]
    fn forfeited_payload_names_the_reason() {
        let event = EmdEvent::Forfeited {
            emd_id: EmdId::new(),
            reason: "bid withdrawn after opening".to_string(),
        };
        assert_eq!(event.payload()["reason"], "bid withdrawn after opening");
    }
}
