//! Server-Sent Events (SSE) infrastructure for ticket notifications.
//!
//! This crate provides the event distribution hub that pushes ticket mutations
//! to the subscribers that asked to watch those tickets.
//!
//! # Architecture
//!
//! - **Single connection per subscriber**: a subscriber id may hold one open
//!   stream at a time; a second `subscribe` is rejected until the first ends.
//! - **Watch registry**: a two-way index between subscriber ids and ticket ids,
//!   kept behind one lock so that both directions always agree.
//! - **Connection table**: subscriber id → bounded outbound channel, keyed by a
//!   server-generated `ConnectionId` so a stale stream never evicts a newer one.
//! - **Non-blocking fan-out**: `publish` never waits on a slow consumer. When a
//!   subscriber's channel is full the event is dropped for that subscriber and
//!   counted.
//! - **Ephemeral delivery**: no backfill. The bounded history is for
//!   diagnostics only.
//!
//! # Message Flow
//!
//! 1. Client opens `/sse/stream?subscriber_id=...`; the hub registers a channel
//!    and the stream yields a `connected` frame
//! 2. Client calls `watch` for each ticket it cares about
//! 3. The ticket gateway mutates a ticket upstream and publishes a `DomainEvent`
//! 4. `SseDomainEventHandler` forwards it to `Hub::publish`
//! 5. The hub snapshots the ticket's watchers and enqueues the event on each
//!    connected watcher's channel
//! 6. When the client goes away the stream is dropped and the hub removes the
//!    connection and all of its watch relations
//!
//! # Example: publishing an event
//!
//! ```rust,ignore
//! use sse::{Hub, HubConfig, message::TicketEventType};
//!
//! let hub = Hub::new(HubConfig::default());
//! hub.publish(42, TicketEventType::TicketUpdated, json!({"status": "closed"}))?;
//! ```
//!
//! # Modules
//!
//! - `connection`: ConnectionTable with type-safe ConnectionId
//! - `watchers`: WatcherRegistry (subscriber ↔ ticket index)
//! - `history`: bounded event history
//! - `hub`: the Hub orchestrating registry, table and history
//! - `subscription`: the per-subscriber event stream
//! - `message`: event types and SSE rendering
//! - `domain_event_handler`: bridge from `events::DomainEvent` to the hub

pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod history;
pub mod hub;
pub mod message;
pub mod subscription;
pub mod watchers;

pub use connection::SubscriberId;
pub use error::{Error, ErrorKind};
pub use events::TicketId;
pub use hub::{Hub, HubConfig, HubStats, PublishReport};
pub use subscription::Subscription;
