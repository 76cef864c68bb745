//! EMD aggregate entity.
//!
//! An earnest-money deposit secures a bid on a tender. Deposits are
//! never hard-deleted; they only move between states, and the two
//! money-moving sinks (refunded, forfeited) are terminal. Expiry is the
//! one time-driven transition, applied by the scheduled sweep.

use serde::{Deserialize, Serialize};

use crate::domain::bid::Bid;
use crate::domain::foundation::{
    Actor, ActorRole, BidId, DomainError, EmdId, Money, StateMachine, TenderId, Timestamp,
};

use super::{EmdEvent, EmdStatus};

/// The EMD aggregate root.
///
/// # Invariants
///
/// - Refunded and forfeited are terminal.
/// - Forfeiture happens only against a linked bid that was rejected or
///   withdrawn; a deposit with no disqualified bid cannot be forfeited.
/// - Expiry is reached only through [`expire`](Emd::expire) when the
///   validity date has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emd {
    id: EmdId,
    tender_id: TenderId,
    bid_id: Option<BidId>,
    amount: Money,
    status: EmdStatus,
    validity: Timestamp,
    verified: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(skip, default)]
    events: Vec<EmdEvent>,
}

impl Emd {
    /// Registers a new active deposit.
    pub fn new(tender_id: TenderId, amount: Money, validity: Timestamp) -> Self {
        let id = EmdId::new();
        let now = Timestamp::now();
        let mut emd = Self {
            id,
            tender_id,
            bid_id: None,
            amount,
            status: EmdStatus::Active,
            validity,
            verified: false,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        emd.record_event(EmdEvent::Registered {
            emd_id: id,
            tender_id,
        });
        emd
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the deposit ID.
    pub fn id(&self) -> EmdId {
        self.id
    }

    /// Returns the tender the deposit secures.
    pub fn tender_id(&self) -> TenderId {
        self.tender_id
    }

    /// Returns the linked bid, if any.
    pub fn bid_id(&self) -> Option<BidId> {
        self.bid_id
    }

    /// Returns the deposit amount.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the current status.
    pub fn status(&self) -> EmdStatus {
        self.status
    }

    /// Returns the validity date.
    pub fn validity(&self) -> Timestamp {
        self.validity
    }

    /// Returns whether an officer has verified the instrument.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Takes accumulated domain events, clearing the internal buffer.
    pub fn take_events(&mut self) -> Vec<EmdEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────────────────────────────────────────────
    // Mutations
    // ───────────────────────────────────────────────────────────────

    /// Links the deposit to a bid.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the deposit is already linked to another bid.
    pub fn link_bid(&mut self, bid_id: BidId) -> Result<(), DomainError> {
        match self.bid_id {
            Some(existing) if existing != bid_id => Err(DomainError::invalid_state(
                "Emd",
                self.id,
                format!("already linked to bid {}", existing),
                "link_bid",
            )),
            Some(_) => Ok(()),
            None => {
                self.bid_id = Some(bid_id);
                self.touch();
                self.record_event(EmdEvent::BidLinked {
                    emd_id: self.id,
                    bid_id,
                });
                Ok(())
            }
        }
    }

    /// Marks the payment instrument verified. Idempotent: verifying an
    /// already-verified deposit is a no-op success.
    ///
    /// Returns true when the call changed state (callers skip the save
    /// and the notification otherwise).
    pub fn verify(&mut self, actor: &Actor, remarks: Option<String>) -> Result<bool, DomainError> {
        self.require_back_office(actor, "verify")?;
        if self.verified {
            return Ok(false);
        }
        self.verified = true;
        self.touch();
        self.record_event(EmdEvent::Verified {
            emd_id: self.id,
            remarks,
        });
        Ok(true)
    }

    /// Refunds an active deposit.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the deposit is not active.
    pub fn refund(&mut self, actor: &Actor, reason: impl Into<String>) -> Result<(), DomainError> {
        self.require_back_office(actor, "refund")?;
        if self.status != EmdStatus::Active {
            return Err(DomainError::invalid_state(
                "Emd",
                self.id,
                self.status,
                "refund",
            ));
        }
        self.status = self
            .status
            .transition_to(EmdStatus::Refunded, "Emd", self.id)?;
        let reason = reason.into();
        self.touch();
        self.record_event(EmdEvent::Refunded {
            emd_id: self.id,
            reason,
        });
        Ok(())
    }

    /// Forfeits an active deposit whose linked bid was disqualified.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the deposit is not active.
    /// - `PreconditionFailed` if no bid is linked, the provided bid does
    ///   not match the link, or the bid is not rejected/withdrawn.
    pub fn forfeit(
        &mut self,
        actor: &Actor,
        reason: impl Into<String>,
        linked_bid: Option<&Bid>,
    ) -> Result<(), DomainError> {
        self.require_back_office(actor, "forfeit")?;
        if self.status != EmdStatus::Active {
            return Err(DomainError::invalid_state(
                "Emd",
                self.id,
                self.status,
                "forfeit",
            ));
        }

        let linked_id = self.bid_id.ok_or_else(|| {
            DomainError::precondition_failed(
                "Emd",
                self.id,
                "no bid is linked; a deposit without a disqualified bid cannot be forfeited",
            )
        })?;
        let bid = linked_bid.filter(|b| b.id() == linked_id).ok_or_else(|| {
            DomainError::precondition_failed(
                "Emd",
                self.id,
                format!("linked bid {} was not found", linked_id),
            )
        })?;
        if !bid.status().is_disqualified() {
            return Err(DomainError::precondition_failed(
                "Emd",
                self.id,
                format!(
                    "linked bid {} is {}, expected rejected or withdrawn",
                    linked_id,
                    bid.status()
                ),
            ));
        }

        self.status = self
            .status
            .transition_to(EmdStatus::Forfeited, "Emd", self.id)?;
        let reason = reason.into();
        self.touch();
        self.record_event(EmdEvent::Forfeited {
            emd_id: self.id,
            reason,
        });
        Ok(())
    }

    /// Applies the time-driven expiry transition.
    ///
    /// Returns true when the deposit moved to expired. Already-expired
    /// and terminal deposits, and deposits still within validity, are
    /// left untouched, so re-running a sweep over the same records is a
    /// no-op.
    pub fn expire(&mut self, now: Timestamp) -> Result<bool, DomainError> {
        if self.status != EmdStatus::Active || !self.validity.is_before(&now) {
            return Ok(false);
        }
        self.status = self
            .status
            .transition_to(EmdStatus::Expired, "Emd", self.id)?;
        self.touch();
        self.record_event(EmdEvent::Expired { emd_id: self.id });
        Ok(true)
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    fn require_back_office(&self, actor: &Actor, attempted: &'static str) -> Result<(), DomainError> {
        if matches!(actor.role, ActorRole::Officer | ActorRole::Admin) {
            Ok(())
        } else {
            Err(
                DomainError::unauthorized("Emd", self.id, "officer or admin", actor.role)
                    .with_detail("attempted", attempted),
            )
        }
    }

    fn record_event(&mut self, event: EmdEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
