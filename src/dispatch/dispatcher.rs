//! Event dispatcher - fan-out of committed transitions to subscribers.
//!
//! The dispatcher runs after the triggering transition has committed;
//! its failures are recovered locally (bounded retry, then drop and
//! log) and never surface into the transition's result. Connections
//! that join after dispatch do not receive historical events: there is
//! no replay buffer, and history lives in the persisted audit trail.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::foundation::{ConnectionId, Notification};
use crate::ports::{Notifier, NotifyError};

use super::SubscriptionRegistry;

/// Bounds for per-connection delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per (connection, notification), including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles each further retry.
    pub base_backoff: Duration,
    /// Upper bound for a single send.
    pub send_timeout: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Fans committed lifecycle transitions out to live subscribers.
///
/// Delivery contract: best-effort at-least-once to the connections that
/// are subscribed at dispatch time, each addressed notification pushed
/// once per subscriber. A connection that keeps failing is dropped from
/// the registry so it cannot stall future dispatches.
pub struct EventDispatcher {
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
}

impl EventDispatcher {
    /// Creates a dispatcher over a registry and an outbound notifier.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            notifier,
            policy,
        }
    }

    /// Returns the registry this dispatcher resolves subscribers from.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Delivers a batch of notifications, in order, to every current
    /// subscriber of each notification's topic.
    ///
    /// Failures are handled per connection; this method never errors.
    pub async fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in &notifications {
            self.fan_out(notification).await;
        }
    }

    /// Spawns the dispatch on the runtime and returns immediately.
    ///
    /// Lifecycle services call this after a successful save so that the
    /// transition result never waits on (or fails with) delivery.
    pub fn dispatch_detached(self: &Arc<Self>, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.dispatch(notifications).await;
        });
    }

    async fn fan_out(&self, notification: &Notification) {
        let subscribers = self.registry.subscribers(&notification.topic).await;
        if subscribers.is_empty() {
            return;
        }
        join_all(
            subscribers
                .into_iter()
                .map(|connection| self.deliver_with_retry(connection, notification)),
        )
        .await;
    }

    async fn deliver_with_retry(&self, connection: ConnectionId, notification: &Notification) {
        let mut attempt: u32 = 0;
        loop {
            let outcome =
                match tokio::time::timeout(
                    self.policy.send_timeout,
                    self.notifier.deliver(&connection, notification),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(NotifyError::Timeout),
                };

            match outcome {
                Ok(()) => return,
                Err(err) if err.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    tokio::time::sleep(self.policy.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    let removed = self.registry.disconnect(&connection).await;
                    tracing::warn!(
                        connection = %connection,
                        topic = %notification.topic,
                        event_type = %notification.event_type,
                        error = %err,
                        attempts = attempt + 1,
                        removed_topics = removed,
                        "dropping connection after failed delivery"
                    );
                    return;
                }
            }
        }
    }
}
