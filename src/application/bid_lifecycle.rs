//! BidLifecycle service - orchestrates bid transitions.
//!
//! Every operation follows the same shape: load the aggregate with its
//! version, apply the domain transition, save conditionally on that
//! version, then hand the recorded events to the dispatcher. Dispatch is
//! detached, so a slow or failing subscriber never affects the caller's
//! result.

use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::domain::bid::{Bid, BidEvent};
use crate::domain::emd::Emd;
use crate::domain::foundation::{
    Actor, ActorRole, BidId, DomainError, EmdId, Money, Notification, TenderId, Topic,
};
use crate::ports::{BidStore, EmdStore, RecordStore, TenderReader, Versioned};

/// Lifecycle controller for bids. Single writer for the Bid aggregate:
/// workflow-driven effects on bids route through this service too.
pub struct BidLifecycle {
    bids: Arc<dyn BidStore>,
    emds: Arc<dyn EmdStore>,
    tenders: Arc<dyn TenderReader>,
    dispatcher: Arc<EventDispatcher>,
}

impl BidLifecycle {
    /// Creates the service over its ports.
    pub fn new(
        bids: Arc<dyn BidStore>,
        emds: Arc<dyn EmdStore>,
        tenders: Arc<dyn TenderReader>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            bids,
            emds,
            tenders,
            dispatcher,
        }
    }

    /// Creates a draft bid for the acting bidder.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless the actor is a bidder or admin.
    /// - `NotFound` if the tender does not exist.
    pub async fn create_draft(
        &self,
        actor: &Actor,
        tender_id: TenderId,
        amount: Money,
    ) -> Result<Bid, DomainError> {
        if !matches!(actor.role, ActorRole::Bidder | ActorRole::Admin) {
            return Err(DomainError::unauthorized(
                "Bid",
                "new",
                "bidder or admin",
                actor.role,
            ));
        }
        self.tenders
            .snapshot(&tender_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Tender", tender_id))?;

        let mut bid = Bid::new(tender_id, actor.id.clone(), amount);
        let events = bid.take_events();
        self.bids.insert(&bid.id(), &bid).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&bid, events));
        Ok(bid)
    }

    /// Links an earnest-money deposit to a draft bid (both directions).
    pub async fn link_emd(
        &self,
        bid_id: BidId,
        emd_id: EmdId,
        actor: &Actor,
    ) -> Result<Bid, DomainError> {
        let Versioned {
            record: mut bid,
            version: bid_version,
        } = self
            .bids
            .load(&bid_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Bid", bid_id))?;
        self.authorize_owner(&bid, actor)?;

        let Versioned {
            record: mut emd,
            version: emd_version,
        } = self
            .emds
            .load(&emd_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Emd", emd_id))?;
        if emd.tender_id() != bid.tender_id() {
            return Err(DomainError::precondition_failed(
                "Bid",
                bid_id,
                format!("EMD {} belongs to a different tender", emd_id),
            ));
        }

        bid.link_emd(emd_id)?;
        emd.link_bid(bid_id)?;

        let bid_events = bid.take_events();
        let emd_events = emd.take_events();
        self.bids.save(&bid_id, &bid, bid_version).await?;
        self.emds.save(&emd_id, &emd, emd_version).await?;

        let mut notifications = self.notifications_for(&bid, bid_events);
        for event in &emd_events {
            notifications.push(Notification::new(
                Topic::Tender(emd.tender_id()),
                event.event_type(),
                event.emd_id(),
                event.payload(),
            ));
        }
        self.dispatcher.dispatch_detached(notifications);
        Ok(bid)
    }

    /// Submits a draft bid against its tender.
    ///
    /// Checks the tender is open and, when it mandates a deposit, that
    /// the linked EMD is active and covers the floor.
    pub async fn submit(&self, bid_id: BidId, actor: &Actor) -> Result<Bid, DomainError> {
        let Versioned {
            record: mut bid,
            version,
        } = self
            .bids
            .load(&bid_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Bid", bid_id))?;

        let tender = self
            .tenders
            .snapshot(&bid.tender_id())
            .await?
            .ok_or_else(|| DomainError::not_found("Tender", bid.tender_id()))?;

        let emd: Option<Emd> = match bid.emd_id() {
            Some(emd_id) => self.emds.load(&emd_id).await?.map(|v| v.record),
            None => None,
        };

        bid.submit(actor, &tender, emd.as_ref())?;

        let events = bid.take_events();
        self.bids.save(&bid_id, &bid, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&bid, events));
        Ok(bid)
    }

    /// Moves a submitted bid into evaluation.
    pub async fn move_to_review(&self, bid_id: BidId, actor: &Actor) -> Result<Bid, DomainError> {
        self.mutate(bid_id, |bid| bid.move_to_review(actor)).await
    }

    /// Shortlists a bid under review.
    pub async fn shortlist(
        &self,
        bid_id: BidId,
        actor: &Actor,
        score: Option<f64>,
    ) -> Result<Bid, DomainError> {
        self.mutate(bid_id, |bid| bid.shortlist(actor, score)).await
    }

    /// Rejects a bid under review with a mandatory reason.
    pub async fn reject(
        &self,
        bid_id: BidId,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Bid, DomainError> {
        let reason = reason.into();
        self.mutate(bid_id, |bid| bid.reject(actor, reason)).await
    }

    /// Awards a shortlisted bid.
    ///
    /// The emitted event carries the linked deposit so the calling
    /// workflow can decide its disposition; no EMD is mutated here.
    pub async fn award(&self, bid_id: BidId, actor: &Actor) -> Result<Bid, DomainError> {
        self.mutate(bid_id, |bid| bid.award(actor)).await
    }

    /// Withdraws a submitted or under-review bid. Non-reversible.
    pub async fn withdraw(
        &self,
        bid_id: BidId,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Bid, DomainError> {
        let reason = reason.into();
        self.mutate(bid_id, |bid| bid.withdraw(actor, reason)).await
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    async fn mutate<F>(&self, bid_id: BidId, op: F) -> Result<Bid, DomainError>
    where
        F: FnOnce(&mut Bid) -> Result<(), DomainError> + Send,
    {
        let Versioned {
            record: mut bid,
            version,
        } = self
            .bids
            .load(&bid_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Bid", bid_id))?;

        op(&mut bid)?;

        let events = bid.take_events();
        self.bids.save(&bid_id, &bid, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&bid, events));
        Ok(bid)
    }

    fn authorize_owner(&self, bid: &Bid, actor: &Actor) -> Result<(), DomainError> {
        let is_owner = actor.role == ActorRole::Bidder && &actor.id == bid.bidder_id();
        if is_owner || actor.role.is_admin() {
            Ok(())
        } else {
            Err(DomainError::unauthorized(
                "Bid",
                bid.id(),
                "bidder (owner) or admin",
                actor.role,
            ))
        }
    }

    /// Each bid event is announced on the bid's own channel and on its
    /// tender's channel.
    fn notifications_for(&self, bid: &Bid, events: Vec<BidEvent>) -> Vec<Notification> {
        let mut notifications = Vec::with_capacity(events.len() * 2);
        for event in events {
            let base = Notification::new(
                Topic::Bid(bid.id()),
                event.event_type(),
                event.bid_id(),
                event.payload(),
            );
            notifications.push(base.readdressed(Topic::Tender(bid.tender_id())));
            notifications.push(base);
        }
        notifications
    }
}
