//! Domain events recorded by the bid aggregate.

use serde_json::{json, Value as JsonValue};

use crate::domain::foundation::{BidId, EmdId, TenderId};

/// Events emitted by `Bid` mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum BidEvent {
    DraftCreated {
        bid_id: BidId,
        tender_id: TenderId,
    },
    EmdLinked {
        bid_id: BidId,
        emd_id: EmdId,
    },
    Submitted {
        bid_id: BidId,
        tender_id: TenderId,
    },
    MovedToReview {
        bid_id: BidId,
    },
    Shortlisted {
        bid_id: BidId,
        evaluation_score: Option<f64>,
    },
    Rejected {
        bid_id: BidId,
        reason: String,
    },
    /// Award carries the linked deposit so downstream workflows can
    /// decide its disposition; the core never mutates the EMD here.
    Awarded {
        bid_id: BidId,
        emd_id: Option<EmdId>,
    },
    Withdrawn {
        bid_id: BidId,
        reason: String,
    },
}

impl BidEvent {
    /// Event type string used for client-side routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            BidEvent::DraftCreated { .. } => "bid.draft_created",
            BidEvent::EmdLinked { .. } => "bid.emd_linked",
            BidEvent::Submitted { .. } => "bid.submitted",
            BidEvent::MovedToReview { .. } => "bid.under_review",
            BidEvent::Shortlisted { .. } => "bid.shortlisted",
            BidEvent::Rejected { .. } => "bid.rejected",
            BidEvent::Awarded { .. } => "bid.awarded",
            BidEvent::Withdrawn { .. } => "bid.withdrawn",
        }
    }

    /// The bid the event concerns.
    pub fn bid_id(&self) -> BidId {
        match self {
            BidEvent::DraftCreated { bid_id, .. }
            | BidEvent::EmdLinked { bid_id, .. }
            | BidEvent::Submitted { bid_id, .. }
            | BidEvent::MovedToReview { bid_id }
            | BidEvent::Shortlisted { bid_id, .. }
            | BidEvent::Rejected { bid_id, .. }
            | BidEvent::Awarded { bid_id, .. }
            | BidEvent::Withdrawn { bid_id, .. } => *bid_id,
        }
    }

    /// Notification payload for this event.
    pub fn payload(&self) -> JsonValue {
        match self {
            BidEvent::DraftCreated { bid_id, tender_id } => json!({
                "bid_id": bid_id,
                "tender_id": tender_id,
            }),
            BidEvent::EmdLinked { bid_id, emd_id } => json!({
                "bid_id": bid_id,
                "emd_id": emd_id,
            }),
            BidEvent::Submitted { bid_id, tender_id } => json!({
                "bid_id": bid_id,
                "tender_id": tender_id,
            }),
            BidEvent::MovedToReview { bid_id } => json!({
                "bid_id": bid_id,
            }),
            BidEvent::Shortlisted {
                bid_id,
                evaluation_score,
            } => json!({
                "bid_id": bid_id,
                "evaluation_score": evaluation_score,
            }),
            BidEvent::Rejected { bid_id, reason } => json!({
                "bid_id": bid_id,
                "reason": reason,
            }),
            BidEvent::Awarded { bid_id, emd_id } => json!({
                "bid_id": bid_id,
                "emd_id": emd_id,
            }),
            BidEvent::Withdrawn { bid_id, reason } => json!({
                "bid_id": bid_id,
                "reason": reason,
            }),
        }
    }
}
