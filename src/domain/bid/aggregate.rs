//! Bid aggregate entity.
//!
//! A bid belongs to one bidder on one tender. Bidders only ever move
//! their bid between draft and submitted (and may withdraw it);
//! evaluation transitions belong to evaluator-capable roles. The
//! aggregate never touches the record store or the deposit; callers
//! load collaborating records and pass them in.

use serde::{Deserialize, Serialize};

use crate::domain::emd::{Emd, EmdStatus};
use crate::domain::foundation::{
    Actor, ActorId, ActorRole, BidId, DomainError, EmdId, Money, StateMachine, TenderId, Timestamp,
};
use crate::domain::tender::TenderSnapshot;

use super::{BidEvent, BidStatus};

/// The Bid aggregate root.
///
/// # Invariants
///
/// - `rejection_reason` is present exactly when status is rejected.
/// - Once submitted against an EMD-mandating tender, `emd_id` is set.
/// - Status edges follow the strict DAG in [`BidStatus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    id: BidId,
    tender_id: TenderId,
    bidder_id: ActorId,
    amount: Money,
    status: BidStatus,
    evaluation_score: Option<f64>,
    rejection_reason: Option<String>,
    withdrawal_reason: Option<String>,
    emd_id: Option<EmdId>,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(skip, default)]
    events: Vec<BidEvent>,
}

impl Bid {
    /// Creates a draft bid.
    pub fn new(tender_id: TenderId, bidder_id: ActorId, amount: Money) -> Self {
        let id = BidId::new();
        let now = Timestamp::now();
        let mut bid = Self {
            id,
            tender_id,
            bidder_id,
            amount,
            status: BidStatus::Draft,
            evaluation_score: None,
            rejection_reason: None,
            withdrawal_reason: None,
            emd_id: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        bid.record_event(BidEvent::DraftCreated {
            bid_id: id,
            tender_id,
        });
        bid
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the bid ID.
    pub fn id(&self) -> BidId {
        self.id
    }

    /// Returns the tender this bid targets.
    pub fn tender_id(&self) -> TenderId {
        self.tender_id
    }

    /// Returns the owning bidder.
    pub fn bidder_id(&self) -> &ActorId {
        &self.bidder_id
    }

    /// Returns the bid amount.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the current status.
    pub fn status(&self) -> BidStatus {
        self.status
    }

    /// Returns the evaluation score, if scored.
    pub fn evaluation_score(&self) -> Option<f64> {
        self.evaluation_score
    }

    /// Returns the rejection reason, if rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Returns the withdrawal reason, if withdrawn.
    pub fn withdrawal_reason(&self) -> Option<&str> {
        self.withdrawal_reason.as_deref()
    }

    /// Returns the linked deposit, if any.
    pub fn emd_id(&self) -> Option<EmdId> {
        self.emd_id
    }

    /// Takes accumulated domain events, clearing the internal buffer.
    pub fn take_events(&mut self) -> Vec<BidEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────────────────────────────────────────────
    // Mutations
    // ───────────────────────────────────────────────────────────────

    /// Links an earnest-money deposit to this draft.
    ///
    /// # Errors
    ///
    /// - `InvalidState` once the bid has been submitted.
    pub fn link_emd(&mut self, emd_id: EmdId) -> Result<(), DomainError> {
        if self.status != BidStatus::Draft {
            return Err(DomainError::invalid_state(
                "Bid",
                self.id,
                self.status,
                "link_emd",
            ));
        }
        self.emd_id = Some(emd_id);
        self.touch();
        self.record_event(BidEvent::EmdLinked {
            bid_id: self.id,
            emd_id,
        });
        Ok(())
    }

    /// Submits the draft against its tender.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless the actor is the owning bidder or admin.
    /// - `InvalidTransition` from any status but draft.
    /// - `PreconditionFailed` if the tender is closed, or it mandates an
    ///   EMD and no active, sufficient deposit is linked.
    pub fn submit(
        &mut self,
        actor: &Actor,
        tender: &TenderSnapshot,
        emd: Option<&Emd>,
    ) -> Result<(), DomainError> {
        self.require_owner_or_admin(actor)?;
        if tender.id != self.tender_id {
            return Err(DomainError::precondition_failed(
                "Bid",
                self.id,
                format!("tender {} does not match bid's tender {}", tender.id, self.tender_id),
            ));
        }

        let next = self
            .status
            .transition_to(BidStatus::Submitted, "Bid", self.id)?;

        if !tender.is_open() {
            return Err(DomainError::precondition_failed(
                "Bid",
                self.id,
                format!("tender {} is not open for submissions", tender.id),
            ));
        }
        if let Some(policy) = &tender.emd_policy {
            self.check_deposit(emd, policy.floor)?;
        }

        self.status = next;
        self.touch();
        self.record_event(BidEvent::Submitted {
            bid_id: self.id,
            tender_id: self.tender_id,
        });
        Ok(())
    }

    /// Moves a submitted bid into evaluation.
    pub fn move_to_review(&mut self, actor: &Actor) -> Result<(), DomainError> {
        self.require_evaluator(actor)?;
        self.status = self
            .status
            .transition_to(BidStatus::UnderReview, "Bid", self.id)?;
        self.touch();
        self.record_event(BidEvent::MovedToReview { bid_id: self.id });
        Ok(())
    }

    /// Shortlists a bid under review, optionally recording its score.
    pub fn shortlist(&mut self, actor: &Actor, score: Option<f64>) -> Result<(), DomainError> {
        self.require_evaluator(actor)?;
        self.status = self
            .status
            .transition_to(BidStatus::Shortlisted, "Bid", self.id)?;
        self.evaluation_score = score;
        self.touch();
        self.record_event(BidEvent::Shortlisted {
            bid_id: self.id,
            evaluation_score: score,
        });
        Ok(())
    }

    /// Rejects a bid under review.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the reason is empty.
    pub fn reject(&mut self, actor: &Actor, reason: impl Into<String>) -> Result<(), DomainError> {
        self.require_evaluator(actor)?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation(
                "reason",
                "a rejection reason is required",
            ));
        }
        self.status = self
            .status
            .transition_to(BidStatus::Rejected, "Bid", self.id)?;
        self.rejection_reason = Some(reason.clone());
        self.touch();
        self.record_event(BidEvent::Rejected {
            bid_id: self.id,
            reason,
        });
        Ok(())
    }

    /// Awards a shortlisted bid.
    ///
    /// The deposit's disposition is decided by the calling workflow; the
    /// emitted event carries the linked EMD for that purpose.
    pub fn award(&mut self, actor: &Actor) -> Result<(), DomainError> {
        self.require_evaluator(actor)?;
        self.status = self
            .status
            .transition_to(BidStatus::Awarded, "Bid", self.id)?;
        self.touch();
        self.record_event(BidEvent::Awarded {
            bid_id: self.id,
            emd_id: self.emd_id,
        });
        Ok(())
    }

    /// Withdraws a submitted or under-review bid. Non-reversible.
    pub fn withdraw(
        &mut self,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.require_owner_or_admin(actor)?;
        self.status = self
            .status
            .transition_to(BidStatus::Withdrawn, "Bid", self.id)?;
        let reason = reason.into();
        self.withdrawal_reason = Some(reason.clone());
        self.touch();
        self.record_event(BidEvent::Withdrawn {
            bid_id: self.id,
            reason,
        });
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    fn require_owner_or_admin(&self, actor: &Actor) -> Result<(), DomainError> {
        let is_owner = actor.role == ActorRole::Bidder && actor.id == self.bidder_id;
        if is_owner || actor.role.is_admin() {
            Ok(())
        } else {
            Err(DomainError::unauthorized(
                "Bid",
                self.id,
                "bidder (owner) or admin",
                actor.role,
            ))
        }
    }

    fn require_evaluator(&self, actor: &Actor) -> Result<(), DomainError> {
        if actor.role.can_evaluate() {
            Ok(())
        } else {
            Err(DomainError::unauthorized(
                "Bid",
                self.id,
                "evaluator or approver",
                actor.role,
            ))
        }
    }

    fn check_deposit(&self, emd: Option<&Emd>, floor: Money) -> Result<(), DomainError> {
        let linked_id = self.emd_id.ok_or_else(|| {
            DomainError::precondition_failed(
                "Bid",
                self.id,
                "tender mandates an EMD but none is linked",
            )
        })?;
        let emd = emd.filter(|e| e.id() == linked_id).ok_or_else(|| {
            DomainError::precondition_failed(
                "Bid",
                self.id,
                format!("linked EMD {} was not found", linked_id),
            )
        })?;
        if emd.tender_id() != self.tender_id {
            return Err(DomainError::precondition_failed(
                "Bid",
                self.id,
                format!("EMD {} belongs to a different tender", linked_id),
            ));
        }
        if emd.status() != EmdStatus::Active {
            return Err(DomainError::precondition_failed(
                "Bid",
                self.id,
                format!("linked EMD {} is {}, not active", linked_id, emd.status()),
            ));
        }
        if !emd.amount().covers(&floor) {
            return Err(DomainError::precondition_failed(
                "Bid",
                self.id,
                format!(
                    "EMD amount {} does not cover the required floor {}",
                    emd.amount(),
                    floor
                ),
            ));
        }
        Ok(())
    }

    fn record_event(&mut self, event: BidEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, ErrorCode, OrgId};
    use crate::domain::tender::EmdPolicy;

    fn inr(amount: i64) -> Money {
        Money::new(amount, Currency::INR).unwrap()
    }

    fn bidder() -> Actor {
        Actor::new(ActorId::new("bidder-1").unwrap(), ActorRole::Bidder)
    }

    fn evaluator() -> Actor {
        Actor::new(ActorId::new("evaluator-1").unwrap(), ActorRole::Evaluator)
    }

    fn open_tender(id: TenderId, floor: Option<i64>) -> TenderSnapshot {
        TenderSnapshot {
            id,
            org_id: OrgId::new(),
            open: true,
            emd_policy: floor.map(|f| EmdPolicy { floor: inr(f) }),
        }
    }

    fn draft_bid(tender_id: TenderId) -> Bid {
        Bid::new(tender_id, ActorId::new("bidder-1").unwrap(), inr(50_000))
    }

    fn active_emd(tender_id: TenderId, amount: i64) -> Emd {
        Emd::new(tender_id, inr(amount), Timestamp::now().add_days(30))
    }

    #[test]
    fn submit_without_required_emd_fails_precondition() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, Some(50_000));

        let err = bid.submit(&bidder(), &tender, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
        assert_eq!(bid.status(), BidStatus::Draft);
    }

    #[test]
    fn submit_succeeds_once_active_emd_covers_floor() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, Some(50_000));
        let emd = active_emd(tender_id, 50_000);

        bid.link_emd(emd.id()).unwrap();
        bid.submit(&bidder(), &tender, Some(&emd)).unwrap();
        assert_eq!(bid.status(), BidStatus::Submitted);
    }

    #[test]
    fn submit_fails_when_emd_below_floor() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, Some(50_000));
        let emd = active_emd(tender_id, 49_000);

        bid.link_emd(emd.id()).unwrap();
        let err = bid.submit(&bidder(), &tender, Some(&emd)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
    }

    #[test]
    fn submit_fails_on_closed_tender() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let mut tender = open_tender(tender_id, None);
        tender.open = false;

        let err = bid.submit(&bidder(), &tender, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
    }

    #[test]
    fn submit_without_emd_requirement_needs_no_deposit() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);

        bid.submit(&bidder(), &tender, None).unwrap();
        assert_eq!(bid.status(), BidStatus::Submitted);
    }

    #[test]
    fn submit_by_another_bidder_is_unauthorized() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);
        let intruder = Actor::new(ActorId::new("bidder-2").unwrap(), ActorRole::Bidder);

        let err = bid.submit(&intruder, &tender, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn submit_twice_fails_with_invalid_transition() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);

        bid.submit(&bidder(), &tender, None).unwrap();
        let err = bid.submit(&bidder(), &tender, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.details.get("current"), Some(&"submitted".to_string()));
    }

    #[test]
    fn evaluation_path_reaches_award_through_shortlist() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);

        bid.submit(&bidder(), &tender, None).unwrap();
        bid.move_to_review(&evaluator()).unwrap();
        bid.shortlist(&evaluator(), Some(87.5)).unwrap();
        bid.award(&evaluator()).unwrap();

        assert_eq!(bid.status(), BidStatus::Awarded);
        assert_eq!(bid.evaluation_score(), Some(87.5));
    }

    #[test]
    fn award_from_under_review_fails_with_invalid_transition() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);

        bid.submit(&bidder(), &tender, None).unwrap();
        bid.move_to_review(&evaluator()).unwrap();
        let err = bid.award(&evaluator()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn reject_requires_a_reason() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);

        bid.submit(&bidder(), &tender, None).unwrap();
        bid.move_to_review(&evaluator()).unwrap();

        let err = bid.reject(&evaluator(), "  ").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        bid.reject(&evaluator(), "incomplete documents").unwrap();
        assert_eq!(bid.status(), BidStatus::Rejected);
        assert_eq!(bid.rejection_reason(), Some("incomplete documents"));
    }

    #[test]
    fn evaluation_actions_refuse_bidders() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);
        bid.submit(&bidder(), &tender, None).unwrap();

        let err = bid.move_to_review(&bidder()).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn withdraw_works_from_submitted_and_under_review_only() {
        let tender_id = TenderId::new();
        let tender = open_tender(tender_id, None);

        let mut bid = draft_bid(tender_id);
        let err = bid.withdraw(&bidder(), "changed my mind").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        bid.submit(&bidder(), &tender, None).unwrap();
        bid.withdraw(&bidder(), "changed my mind").unwrap();
        assert_eq!(bid.status(), BidStatus::Withdrawn);
        assert_eq!(bid.withdrawal_reason(), Some("changed my mind"));

        let err = bid.withdraw(&bidder(), "again").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn link_emd_after_submission_fails_invalid_state() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, None);
        bid.submit(&bidder(), &tender, None).unwrap();

        let err = bid.link_emd(EmdId::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn submit_with_expired_emd_fails_precondition() {
        let tender_id = TenderId::new();
        let mut bid = draft_bid(tender_id);
        let tender = open_tender(tender_id, Some(50_000));
        let mut emd = active_emd(tender_id, 50_000);
        emd.expire(Timestamp::now().add_days(60)).unwrap();

        bid.link_emd(emd.id()).unwrap();
        let err = bid.submit(&bidder(), &tender, Some(&emd)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
    }
}
