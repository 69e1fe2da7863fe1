use crate::connection::{ConnectionId, ConnectionTable, Delivery, SubscriberId};
use crate::error::{hub_error, Error, ErrorKind};
use crate::history::EventHistory;
use crate::message::{TicketEvent, TicketEventType};
use crate::subscription::Subscription;
use crate::watchers::WatcherRegistry;
use events::TicketId;
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_HISTORY_CAPACITY: usize = 1000;
const DEFAULT_MAX_WATCHES: usize = 256;

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Events buffered per subscriber before new ones are dropped for it.
    pub channel_capacity: usize,
    /// Events kept in the diagnostic history.
    pub history_capacity: usize,
    /// Tickets one subscriber may watch at once. Relations of ids that never
    /// connect are only freed by `unwatch`, so this bounds them per id.
    pub max_watches_per_subscriber: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_watches_per_subscriber: DEFAULT_MAX_WATCHES,
        }
    }
}

/// What happened to one published event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Watchers resolved for the ticket at publish time.
    pub watchers: usize,
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    pub connected_subscribers: usize,
    pub watch_relations: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub history_len: usize,
}

/// State shared by the hub and every live `Subscription`.
pub(crate) struct Shared {
    config: HubConfig,
    connections: ConnectionTable,
    // Publish holds the read side while delivering; subscriber removal holds
    // the write side, so no event reaches a channel once removal has begun.
    watchers: RwLock<WatcherRegistry>,
    history: EventHistory,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn watchers(&self) -> RwLockReadGuard<'_, WatcherRegistry> {
        self.watchers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn watchers_mut(&self) -> RwLockWriteGuard<'_, WatcherRegistry> {
        self.watchers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called when a subscriber's stream is dropped.
    pub(crate) fn release(&self, subscriber_id: &str, connection_id: &ConnectionId) {
        let mut watchers = self.watchers_mut();
        if self.connections.unregister(subscriber_id, connection_id) {
            let removed = watchers.remove_subscriber(subscriber_id);
            info!(
                "SSE connection {} closed for subscriber {}, removed {} watch relation(s)",
                connection_id, subscriber_id, removed
            );
        }
    }
}

/// Event distribution hub: owns the watch registry, the connection table and
/// the event history, and exposes them only through its operations.
pub struct Hub {
    shared: Arc<Shared>,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        let history = EventHistory::new(config.history_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                connections: ConnectionTable::new(),
                watchers: RwLock::new(WatcherRegistry::new()),
                history,
                closed: AtomicBool::new(false),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Open the event stream for a subscriber.
    ///
    /// The first item is always `Message::Connected`. The stream ends when the
    /// subscriber is disconnected or the hub shuts down; dropping it releases
    /// the connection and every watch relation of the subscriber.
    pub fn subscribe(&self, subscriber_id: impl Into<SubscriberId>) -> Result<Subscription, Error> {
        let subscriber_id = subscriber_id.into();
        self.ensure_open()?;

        let (sender, receiver) = mpsc::channel(self.shared.config.channel_capacity.max(1));
        let connection_id = self
            .shared
            .connections
            .register(subscriber_id.clone(), sender)?;

        // Lost a race with shutdown after registering.
        if self.shared.closed.load(Ordering::Acquire) {
            self.shared
                .connections
                .unregister(&subscriber_id, &connection_id);
            return Err(closed_error());
        }

        info!(
            "Registered SSE connection {} for subscriber {}",
            connection_id, subscriber_id
        );
        Ok(Subscription::new(
            subscriber_id,
            connection_id,
            receiver,
            Arc::clone(&self.shared),
        ))
    }

    /// Start delivering events of `ticket_id` to the subscriber. Idempotent, and
    /// allowed whether or not the subscriber is currently connected.
    ///
    /// Fails with `WatchLimitReached` when a new relation would exceed
    /// `max_watches_per_subscriber`; re-watching a ticket never does.
    pub fn watch(&self, subscriber_id: &str, ticket_id: TicketId) -> Result<(), Error> {
        self.ensure_open()?;
        let limit = self.shared.config.max_watches_per_subscriber;

        let mut watchers = self.shared.watchers_mut();
        if !watchers.is_watching(subscriber_id, ticket_id)
            && watchers.watch_count(subscriber_id) >= limit
        {
            warn!(
                "Subscriber {} hit the limit of {} watched tickets",
                subscriber_id, limit
            );
            return Err(hub_error(
                ErrorKind::WatchLimitReached,
                &format!("{subscriber_id} already watches {limit} tickets"),
            ));
        }

        if watchers.watch(subscriber_id, ticket_id) {
            if self.shared.connections.is_connected(subscriber_id) {
                debug!("Subscriber {} now watching ticket {}", subscriber_id, ticket_id);
            } else {
                debug!(
                    "Subscriber {} now watching ticket {} before connecting",
                    subscriber_id, ticket_id
                );
            }
        }
        Ok(())
    }

    pub fn unwatch(&self, subscriber_id: &str, ticket_id: TicketId) -> Result<(), Error> {
        if self.shared.watchers_mut().unwatch(subscriber_id, ticket_id) {
            debug!(
                "Subscriber {} no longer watching ticket {}",
                subscriber_id, ticket_id
            );
            Ok(())
        } else {
            Err(hub_error(
                ErrorKind::NotWatching,
                &format!("ticket {ticket_id} not found in watch list of {subscriber_id}"),
            ))
        }
    }

    /// Record the event and fan it out to the ticket's connected watchers.
    ///
    /// Never waits on a consumer: a watcher whose channel is full misses the
    /// event and its drop counter is incremented.
    pub fn publish(
        &self,
        ticket_id: TicketId,
        event_type: TicketEventType,
        payload: Value,
    ) -> Result<PublishReport, Error> {
        self.ensure_open()?;

        let event = Arc::new(TicketEvent::new(ticket_id, event_type, payload));
        self.shared.history.push(Arc::clone(&event));
        self.shared.published.fetch_add(1, Ordering::Relaxed);

        let watchers = self.shared.watchers();
        let subscriber_ids = watchers.watchers_of(ticket_id);
        let mut report = PublishReport {
            watchers: subscriber_ids.len(),
            ..Default::default()
        };

        for subscriber_id in &subscriber_ids {
            match self.shared.connections.deliver(subscriber_id, &event) {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Dropped => report.dropped += 1,
                Delivery::Closed | Delivery::NotConnected => {}
            }
        }
        drop(watchers);

        self.shared
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.shared
            .dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        debug!(
            "Published {} for ticket {}: {} watcher(s), {} delivered, {} dropped",
            event_type, ticket_id, report.watchers, report.delivered, report.dropped
        );
        Ok(report)
    }

    /// Close a subscriber's stream from the server side and forget its watch relations.
    pub fn disconnect(&self, subscriber_id: &str) -> Result<(), Error> {
        let mut watchers = self.shared.watchers_mut();
        if !self.shared.connections.remove(subscriber_id) {
            return Err(not_connected_error(subscriber_id));
        }
        let removed = watchers.remove_subscriber(subscriber_id);
        info!(
            "Disconnected subscriber {}, removed {} watch relation(s)",
            subscriber_id, removed
        );
        Ok(())
    }

    /// End every stream and reject further subscriptions and publishes.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut watchers = self.shared.watchers_mut();
        let connections = self.shared.connections.len();
        self.shared.connections.clear();
        watchers.clear();
        info!("SSE hub shut down, closed {} connection(s)", connections);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn is_connected(&self, subscriber_id: &str) -> bool {
        self.shared.connections.is_connected(subscriber_id)
    }

    pub fn watched_tickets(&self, subscriber_id: &str) -> Vec<TicketId> {
        self.shared.watchers().watched_by(subscriber_id)
    }

    /// Events dropped for the subscriber's current connection because its channel was full.
    pub fn dropped_for(&self, subscriber_id: &str) -> Result<u64, Error> {
        self.shared
            .connections
            .dropped_for(subscriber_id)
            .ok_or_else(|| not_connected_error(subscriber_id))
    }

    pub fn history(&self, ticket_id: Option<TicketId>, limit: usize) -> Vec<Arc<TicketEvent>> {
        self.shared.history.recent(ticket_id, limit)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connected_subscribers: self.shared.connections.len(),
            watch_relations: self.shared.watchers().relation_count(),
            published: self.shared.published.load(Ordering::Relaxed),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            history_len: self.shared.history.len(),
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.shared.closed.load(Ordering::Acquire) {
            Err(closed_error())
        } else {
            Ok(())
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

fn closed_error() -> Error {
    hub_error(ErrorKind::HubClosed, "the event hub is shut down")
}

fn not_connected_error(subscriber_id: &str) -> Error {
    hub_error(
        ErrorKind::SubscriberNotConnected,
        &format!("no open stream for subscriber {subscriber_id}"),
    )
}
