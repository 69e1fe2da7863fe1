use crate::error::{hub_error, Error, ErrorKind};
use crate::message::TicketEvent;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::*;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

/// Opaque, caller-supplied subscriber identity. Not verified.
pub type SubscriberId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscriber's live stream.
#[derive(Debug)]
pub struct ConnectionInfo {
    pub connection_id: ConnectionId,
    pub connected_at: DateTime<Utc>,
    sender: Sender<Arc<TicketEvent>>,
    dropped: AtomicU64,
}

/// Outcome of handing one event to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The subscriber's channel was full; the event was discarded for it.
    Dropped,
    /// The receiving side is already gone; cleanup is pending.
    Closed,
    NotConnected,
}

/// Subscriber id → outbound channel, at most one per subscriber.
pub struct ConnectionTable {
    connections: DashMap<SubscriberId, ConnectionInfo>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a new connection, rejecting a subscriber that already has one.
    pub fn register(
        &self,
        subscriber_id: SubscriberId,
        sender: Sender<Arc<TicketEvent>>,
    ) -> Result<ConnectionId, Error> {
        match self.connections.entry(subscriber_id) {
            Entry::Occupied(entry) => Err(hub_error(
                ErrorKind::DuplicateSubscriber,
                &format!("connection already exists for subscriber {}", entry.key()),
            )),
            Entry::Vacant(entry) => {
                let connection_id = ConnectionId::new();
                entry.insert(ConnectionInfo {
                    connection_id: connection_id.clone(),
                    connected_at: Utc::now(),
                    sender,
                    dropped: AtomicU64::new(0),
                });
                Ok(connection_id)
            }
        }
    }

    /// Remove the subscriber's connection only if it is still `connection_id`.
    pub fn unregister(&self, subscriber_id: &str, connection_id: &ConnectionId) -> bool {
        self.connections
            .remove_if(subscriber_id, |_, info| &info.connection_id == connection_id)
            .is_some()
    }

    /// Remove the subscriber's connection whatever it is.
    pub fn remove(&self, subscriber_id: &str) -> bool {
        self.connections.remove(subscriber_id).is_some()
    }

    /// Enqueue an event without waiting. A full channel drops the event for this subscriber.
    pub fn deliver(&self, subscriber_id: &str, event: &Arc<TicketEvent>) -> Delivery {
        let Some(info) = self.connections.get(subscriber_id) else {
            return Delivery::NotConnected;
        };

        match info.sender.try_send(Arc::clone(event)) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                let dropped = info.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Channel full for subscriber {} on connection {}, dropped {} event (total dropped: {})",
                    subscriber_id,
                    info.connection_id.as_str(),
                    event.event_type,
                    dropped
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    "Receiver gone for subscriber {}, connection will be cleaned up",
                    subscriber_id
                );
                Delivery::Closed
            }
        }
    }

    pub fn is_connected(&self, subscriber_id: &str) -> bool {
        self.connections.contains_key(subscriber_id)
    }

    /// Events dropped for the subscriber's current connection.
    pub fn dropped_for(&self, subscriber_id: &str) -> Option<u64> {
        self.connections
            .get(subscriber_id)
            .map(|info| info.dropped.load(Ordering::Relaxed))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every connection. Each receiver observes the end of its stream.
    pub fn clear(&self) {
        self.connections.clear();
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TicketEventType;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn event() -> Arc<TicketEvent> {
        Arc::new(TicketEvent::new(
            1,
            TicketEventType::TicketUpdated,
            json!({}),
        ))
    }

    #[test]
    fn second_registration_is_rejected() {
        let table = ConnectionTable::new();
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, _rx2) = mpsc::channel(1);

        table.register("u1".to_string(), tx1).unwrap();
        let err = table.register("u1".to_string(), tx2).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::DuplicateSubscriber);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn stale_connection_id_does_not_evict_newer_connection() {
        let table = ConnectionTable::new();
        let (tx1, _rx1) = mpsc::channel(1);
        let first = table.register("u1".to_string(), tx1).unwrap();
        assert!(table.unregister("u1", &first));

        let (tx2, _rx2) = mpsc::channel(1);
        table.register("u1".to_string(), tx2).unwrap();

        assert!(!table.unregister("u1", &first));
        assert!(table.is_connected("u1"));
    }

    #[test]
    fn full_channel_drops_and_counts() {
        let table = ConnectionTable::new();
        let (tx, mut rx) = mpsc::channel(1);
        table.register("u1".to_string(), tx).unwrap();

        assert_eq!(table.deliver("u1", &event()), Delivery::Delivered);
        assert_eq!(table.deliver("u1", &event()), Delivery::Dropped);
        assert_eq!(table.deliver("u1", &event()), Delivery::Dropped);
        assert_eq!(table.dropped_for("u1"), Some(2));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn delivery_to_closed_or_missing_connection_is_a_no_op() {
        let table = ConnectionTable::new();
        let (tx, rx) = mpsc::channel(1);
        table.register("u1".to_string(), tx).unwrap();
        drop(rx);

        assert_eq!(table.deliver("u1", &event()), Delivery::Closed);
        assert_eq!(table.deliver("u2", &event()), Delivery::NotConnected);
    }

    #[test]
    fn clear_closes_every_receiver() {
        let table = ConnectionTable::new();
        let (tx, mut rx) = mpsc::channel::<Arc<TicketEvent>>(1);
        table.register("u1".to_string(), tx).unwrap();

        table.clear();

        assert!(table.is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
