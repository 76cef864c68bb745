//! Subscription registry mapping topics to live connections.
//!
//! Purely in-memory and process-local: subscriptions exist only for the
//! lifetime of the process and are torn down with it. The registry is an
//! explicit, lifecycle-scoped instance owned by the wiring layer, never
//! ambient module state.
//!
//! # Architecture
//!
//! ```text
//! topic tender:123        topic workflow:456
//! ├── conn-a              ├── conn-a
//! ├── conn-b              └── conn-c
//! └── conn-c
//! ```
//!
//! When an event for tender:123 is dispatched, only connections a, b, c
//! receive it.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, Topic};

#[derive(Default)]
struct Maps {
    by_topic: HashMap<Topic, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<Topic>>,
}

/// Tracks which live connections are interested in which topics.
///
/// # Thread Safety
///
/// Both direction maps live behind a single `RwLock` so that a
/// disconnect removes every membership in one atomic pass; a dispatch
/// snapshot can never observe a half-removed connection.
pub struct SubscriptionRegistry {
    maps: RwLock<Maps>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
        }
    }

    /// Subscribes a connection to a topic. Idempotent.
    ///
    /// Returns true if the subscription was newly added.
    pub async fn subscribe(&self, connection: ConnectionId, topic: Topic) -> bool {
        let mut maps = self.maps.write().await;
        let added = maps.by_topic.entry(topic).or_default().insert(connection);
        maps.by_connection.entry(connection).or_default().insert(topic);
        added
    }

    /// Unsubscribes a connection from a topic. Idempotent.
    ///
    /// Returns true if the subscription existed.
    pub async fn unsubscribe(&self, connection: &ConnectionId, topic: &Topic) -> bool {
        let mut maps = self.maps.write().await;
        let removed = match maps.by_topic.get_mut(topic) {
            Some(set) => {
                let removed = set.remove(connection);
                if set.is_empty() {
                    maps.by_topic.remove(topic);
                }
                removed
            }
            None => false,
        };
        if let Some(topics) = maps.by_connection.get_mut(connection) {
            topics.remove(topic);
            if topics.is_empty() {
                maps.by_connection.remove(connection);
            }
        }
        removed
    }

    /// Removes all topic memberships of a connection in one pass.
    ///
    /// Returns the number of topics the connection was subscribed to.
    pub async fn disconnect(&self, connection: &ConnectionId) -> usize {
        let mut maps = self.maps.write().await;
        let Some(topics) = maps.by_connection.remove(connection) else {
            return 0;
        };
        for topic in &topics {
            if let Some(set) = maps.by_topic.get_mut(topic) {
                set.remove(connection);
                if set.is_empty() {
                    maps.by_topic.remove(topic);
                }
            }
        }
        topics.len()
    }

    /// Snapshot of the connections subscribed to a topic.
    pub async fn subscribers(&self, topic: &Topic) -> Vec<ConnectionId> {
        let maps = self.maps.read().await;
        maps.by_topic
            .get(topic)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the topics a connection is subscribed to.
    pub async fn topics_of(&self, connection: &ConnectionId) -> Vec<Topic> {
        let maps = self.maps.read().await;
        maps.by_connection
            .get(connection)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True if the connection is subscribed to the topic.
    pub async fn is_subscribed(&self, connection: &ConnectionId, topic: &Topic) -> bool {
        let maps = self.maps.read().await;
        maps.by_topic
            .get(topic)
            .map(|set| set.contains(connection))
            .unwrap_or(false)
    }

    /// Number of connections with at least one subscription.
    pub async fn connection_count(&self) -> usize {
        self.maps.read().await.by_connection.len()
    }

    /// Number of topics with at least one subscriber.
    pub async fn topic_count(&self) -> usize {
        self.maps.read().await.by_topic.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
