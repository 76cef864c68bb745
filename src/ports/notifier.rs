//! Notifier port - outbound delivery to one live connection.
//!
//! The dispatcher resolves topics to connection ids and pushes each
//! notification through this port. Implementations wrap whatever
//! transport actually holds the socket (WebSocket writer, SSE sink,
//! in-process channel in tests).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ConnectionId, Notification};

/// Delivery failure for a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The connection is gone; retrying cannot help.
    #[error("connection closed")]
    Closed,

    /// The connection's buffer is full; may clear shortly.
    #[error("connection backpressured")]
    Backpressure,

    /// The send did not finish within the bounded timeout.
    #[error("delivery timed out")]
    Timeout,
}

impl NotifyError {
    /// True for failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotifyError::Backpressure | NotifyError::Timeout)
    }
}

/// Port for pushing a notification to one live connection.
///
/// Implementations must return promptly: the dispatcher applies its own
/// send timeout on top, and a hung send would stall the fan-out task for
/// that connection.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification to one connection.
    async fn deliver(
        &self,
        connection: &ConnectionId,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}
