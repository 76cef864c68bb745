//! Channel-backed notifier for tests and single-process embedding.
//!
//! Each registered connection gets a bounded mpsc channel; the receiver
//! half is what an embedding transport (or a test) drains. A full buffer
//! surfaces as backpressure so the dispatcher's retry path is exercised
//! exactly as it would be against a slow socket.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

use crate::domain::foundation::{ConnectionId, Notification};
use crate::ports::{Notifier, NotifyError};

/// Default per-connection buffer capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Notifier delivering into per-connection bounded channels.
pub struct ChannelNotifier {
    capacity: usize,
    senders: RwLock<HashMap<ConnectionId, mpsc::Sender<Notification>>>,
}

impl ChannelNotifier {
    /// Creates a notifier with the given per-connection buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a notifier with the default capacity.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Registers a connection, returning the receiving half.
    ///
    /// Registering an existing connection replaces its channel.
    pub fn register(&self, connection: ConnectionId) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders
            .write()
            .expect("ChannelNotifier: lock poisoned")
            .insert(connection, tx);
        rx
    }

    /// Removes a connection; subsequent deliveries report it closed.
    pub fn deregister(&self, connection: &ConnectionId) {
        self.senders
            .write()
            .expect("ChannelNotifier: lock poisoned")
            .remove(connection);
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.senders
            .read()
            .expect("ChannelNotifier: lock poisoned")
            .len()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn deliver(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let sender = {
            let senders = self.senders.read().expect("ChannelNotifier: lock poisoned");
            senders.get(connection).cloned()
        };
        let Some(sender) = sender else {
            return Err(NotifyError::Closed);
        };
        match sender.try_send(notification.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(NotifyError::Backpressure),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(NotifyError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{TenderId, Topic, WorkflowId};
    use serde_json::json;

    fn notification() -> Notification {
        Notification::new(
            Topic::Tender(TenderId::new()),
            "workflow.started",
            WorkflowId::new(),
            json!({}),
        )
    }

    #[tokio::test]
    async fn delivers_to_registered_connection() {
        let notifier = ChannelNotifier::with_default_capacity();
        let conn = ConnectionId::new();
        let mut rx = notifier.register(conn);

        notifier.deliver(&conn, &notification()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "workflow.started");
    }

    #[tokio::test]
    async fn unknown_connection_reports_closed() {
        let notifier = ChannelNotifier::with_default_capacity();
        let err = notifier
            .deliver(&ConnectionId::new(), &notification())
            .await
            .unwrap_err();
        assert_eq!(err, NotifyError::Closed);
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed() {
        let notifier = ChannelNotifier::with_default_capacity();
        let conn = ConnectionId::new();
        drop(notifier.register(conn));

        let err = notifier.deliver(&conn, &notification()).await.unwrap_err();
        assert_eq!(err, NotifyError::Closed);
    }

    #[tokio::test]
    async fn full_buffer_reports_backpressure() {
        let notifier = ChannelNotifier::new(1);
        let conn = ConnectionId::new();
        let _rx = notifier.register(conn);

        notifier.deliver(&conn, &notification()).await.unwrap();
        let err = notifier.deliver(&conn, &notification()).await.unwrap_err();
        assert_eq!(err, NotifyError::Backpressure);
    }

    #[tokio::test]
    async fn deregister_closes_the_connection() {
        let notifier = ChannelNotifier::with_default_capacity();
        let conn = ConnectionId::new();
        let _rx = notifier.register(conn);
        assert_eq!(notifier.connection_count(), 1);

        notifier.deregister(&conn);
        assert_eq!(notifier.connection_count(), 0);
        let err = notifier.deliver(&conn, &notification()).await.unwrap_err();
        assert_eq!(err, NotifyError::Closed);
    }
}
