//! Event system infrastructure for the ticket notifier.
//!
//! This crate decouples the ticket gateway (which performs mutations against the
//! upstream ticketing API) from the infrastructure that reacts to them (the SSE hub).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing every ticket mutation the gateway can perform
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies. Upstream results are carried as serialized JSON values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Ticket identifier as assigned by the upstream ticketing system.
pub type TicketId = u64;

/// Domain events that represent successful ticket mutations.
///
/// Each variant carries the upstream result payload as-is so that subscribers
/// receive exactly what the ticketing API returned.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A new ticket was created upstream.
    TicketCreated { ticket_id: TicketId, ticket: Value },
    /// Fields of an existing ticket were changed.
    TicketUpdated { ticket_id: TicketId, ticket: Value },
    /// A follow-up was appended to a ticket.
    FollowupAdded { ticket_id: TicketId, followup: Value },
    /// A solution was recorded for a ticket.
    SolutionAdded { ticket_id: TicketId, solution: Value },
}

impl DomainEvent {
    pub fn ticket_id(&self) -> TicketId {
        match self {
            DomainEvent::TicketCreated { ticket_id, .. }
            | DomainEvent::TicketUpdated { ticket_id, .. }
            | DomainEvent::FollowupAdded { ticket_id, .. }
            | DomainEvent::SolutionAdded { ticket_id, .. } => *ticket_id,
        }
    }
}

/// Error returned by a handler that could not process an event.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

/// Errors surfaced by [`EventPublisher::publish`].
#[derive(Debug)]
pub struct Error {
    pub source: Option<HandlerError>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// No handler is registered, so the event went nowhere.
    NoHandlers,
    /// One or more handlers failed. Carries the number of failures.
    HandlerFailed(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::NoHandlers => write!(f, "Event error: no handlers registered"),
            ErrorKind::HandlerFailed(count) => {
                write!(f, "Event error: {count} handler(s) failed")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like pushing notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers.
    ///
    /// A failing handler does not stop the remaining handlers; every failure is
    /// logged and the last one is returned as the error source.
    pub async fn publish(&self, event: DomainEvent) -> Result<(), Error> {
        if self.handlers.is_empty() {
            return Err(Error {
                source: None,
                error_kind: ErrorKind::NoHandlers,
            });
        }

        let mut failures = 0;
        let mut last_error = None;
        for handler in self.handlers.iter() {
            if let Err(e) = handler.handle(&event).await {
                warn!(
                    "Event handler failed for ticket {}: {e}",
                    event.ticket_id()
                );
                failures += 1;
                last_error = Some(e);
            }
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(Error {
                source: last_error,
                error_kind: ErrorKind::HandlerFailed(failures),
            })
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("handler down".into())
            } else {
                Ok(())
            }
        }
    }

    fn updated(ticket_id: TicketId) -> DomainEvent {
        DomainEvent::TicketUpdated {
            ticket_id,
            ticket: json!({"status": "closed"}),
        }
    }

    #[tokio::test]
    async fn publish_without_handlers_reports_no_handlers() {
        let publisher = EventPublisher::new();
        let err = publisher.publish(updated(1)).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::NoHandlers);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_others() {
        let failing = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let publisher = EventPublisher::new()
            .with_handler(failing.clone())
            .with_handler(healthy.clone());

        let err = publisher.publish(updated(7)).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::HandlerFailed(1));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ticket_id_is_available_for_every_variant() {
        let followup = DomainEvent::FollowupAdded {
            ticket_id: 3,
            followup: json!({}),
        };
        assert_eq!(followup.ticket_id(), 3);
        assert_eq!(updated(9).ticket_id(), 9);
    }
}
