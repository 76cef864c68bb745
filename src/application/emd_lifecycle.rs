//! EmdLifecycle service - orchestrates deposit transitions.
//!
//! Besides the actor-driven operations, this service owns the one
//! time-driven transition in the core: the expiration sweep. The sweep
//! is checkpointed per record and interruptible between records, so a
//! restart resumes safely; expiring an already-expired deposit is a
//! no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::domain::bid::Bid;
use crate::domain::emd::{Emd, EmdEvent};
use crate::domain::foundation::{
    Actor, DomainError, EmdId, ErrorCode, Money, Notification, TenderId, Timestamp, Topic,
};
use crate::ports::{BidStore, EmdStore, RecordStore, Versioned};

/// Cooperative cancellation handle for a running sweep.
///
/// The sweep checks the flag between records; setting it stops the
/// batch at the next checkpoint.
#[derive(Clone, Default)]
pub struct SweepCancel(Arc<AtomicBool>);

impl SweepCancel {
    /// Creates an un-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the sweep to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records examined.
    pub scanned: usize,
    /// Records transitioned to expired.
    pub expired: usize,
    /// Records lost to a version race; the next sweep retries them.
    pub conflicts: usize,
    /// True when the sweep stopped at a checkpoint before finishing.
    pub interrupted: bool,
}

/// Lifecycle controller for earnest-money deposits. Single writer for
/// the Emd aggregate.
pub struct EmdLifecycle {
    emds: Arc<dyn EmdStore>,
    bids: Arc<dyn BidStore>,
    dispatcher: Arc<EventDispatcher>,
}

impl EmdLifecycle {
    /// Creates the service over its ports.
    pub fn new(
        emds: Arc<dyn EmdStore>,
        bids: Arc<dyn BidStore>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            emds,
            bids,
            dispatcher,
        }
    }

    /// Registers a new active deposit after a payment instrument lands.
    pub async fn register(
        &self,
        tender_id: TenderId,
        amount: Money,
        validity: Timestamp,
    ) -> Result<Emd, DomainError> {
        let mut emd = Emd::new(tender_id, amount, validity);
        let events = emd.take_events();
        self.emds.insert(&emd.id(), &emd).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&emd, events));
        Ok(emd)
    }

    /// Marks the deposit's instrument verified. Idempotent: verifying an
    /// already-verified deposit saves nothing and notifies nobody.
    pub async fn verify(
        &self,
        emd_id: EmdId,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<Emd, DomainError> {
        let Versioned {
            record: mut emd,
            version,
        } = self.load(emd_id).await?;

        if !emd.verify(actor, remarks)? {
            tracing::debug!(emd = %emd_id, "verify on already-verified deposit, no-op");
            return Ok(emd);
        }

        let events = emd.take_events();
        self.emds.save(&emd_id, &emd, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&emd, events));
        Ok(emd)
    }

    /// Refunds an active deposit.
    pub async fn refund(
        &self,
        emd_id: EmdId,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Emd, DomainError> {
        let Versioned {
            record: mut emd,
            version,
        } = self.load(emd_id).await?;

        emd.refund(actor, reason)?;

        let events = emd.take_events();
        self.emds.save(&emd_id, &emd, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&emd, events));
        Ok(emd)
    }

    /// Forfeits an active deposit whose linked bid was disqualified.
    ///
    /// Loads the linked bid (read-only) to check the precondition; a
    /// deposit with no linked, disqualified bid cannot be forfeited.
    pub async fn forfeit(
        &self,
        emd_id: EmdId,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Emd, DomainError> {
        let Versioned {
            record: mut emd,
            version,
        } = self.load(emd_id).await?;

        let linked_bid: Option<Bid> = match emd.bid_id() {
            Some(bid_id) => self.bids.load(&bid_id).await?.map(|v| v.record),
            None => None,
        };

        emd.forfeit(actor, reason, linked_bid.as_ref())?;

        let events = emd.take_events();
        self.emds.save(&emd_id, &emd, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&emd, events));
        Ok(emd)
    }

    /// Expires every active deposit whose validity date passed.
    ///
    /// Run by an external scheduler. Each record commits individually;
    /// version races are counted and left for the next sweep, and the
    /// cancellation handle stops the batch between records.
    pub async fn sweep_expirations(
        &self,
        now: Timestamp,
        cancel: &SweepCancel,
    ) -> Result<SweepReport, DomainError> {
        let due = self.emds.list_active_due(now).await?;
        let mut report = SweepReport::default();

        for emd_id in due {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }
            report.scanned += 1;
            match self.expire_one(emd_id, now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => {}
                Err(err) if err.code == ErrorCode::Conflict => {
                    report.conflicts += 1;
                    tracing::debug!(emd = %emd_id, "expiry lost a version race, deferring to next sweep");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            scanned = report.scanned,
            expired = report.expired,
            conflicts = report.conflicts,
            interrupted = report.interrupted,
            "expiration sweep finished"
        );
        Ok(report)
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    async fn expire_one(&self, emd_id: EmdId, now: Timestamp) -> Result<bool, DomainError> {
        // The listing may be stale; a missing or already-transitioned
        // record is simply not due anymore.
        let Some(Versioned {
            record: mut emd,
            version,
        }) = self.emds.load(&emd_id).await?
        else {
            return Ok(false);
        };

        if !emd.expire(now)? {
            return Ok(false);
        }

        let events = emd.take_events();
        self.emds.save(&emd_id, &emd, version).await?;
        self.dispatcher.dispatch_detached(self.notifications_for(&emd, events));
        Ok(true)
    }

    async fn load(&self, emd_id: EmdId) -> Result<Versioned<Emd>, DomainError> {
        self.emds
            .load(&emd_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Emd", emd_id))
    }

    /// Deposit events are announced on the tender's channel and, when a
    /// bid is linked, on that bid's channel.
    fn notifications_for(&self, emd: &Emd, events: Vec<EmdEvent>) -> Vec<Notification> {
        let mut notifications = Vec::with_capacity(events.len() * 2);
        for event in events {
            let base = Notification::new(
                Topic::Tender(emd.tender_id()),
                event.event_type(),
                event.emd_id(),
                event.payload(),
            );
            if let Some(bid_id) = emd.bid_id() {
                notifications.push(base.readdressed(Topic::Bid(bid_id)));
            }
            notifications.push(base);
        }
        notifications
    }
}
