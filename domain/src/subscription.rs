//! Watch management and diagnostics over the event hub.

use crate::error::Error;
use events::TicketId;
use service::AppState;
use sse::message::TicketEvent;
use sse::{HubStats, Subscription};
use std::sync::Arc;

pub use sse::message::{EventName, Message};

/// Open the subscriber's event stream. Fails if the subscriber already has one.
pub fn subscribe(app_state: &AppState, subscriber_id: &str) -> Result<Subscription, Error> {
    Ok(app_state.sse_hub.subscribe(subscriber_id)?)
}

pub fn watch(app_state: &AppState, subscriber_id: &str, ticket_id: TicketId) -> Result<(), Error> {
    Ok(app_state.sse_hub.watch(subscriber_id, ticket_id)?)
}

pub fn unwatch(
    app_state: &AppState,
    subscriber_id: &str,
    ticket_id: TicketId,
) -> Result<(), Error> {
    Ok(app_state.sse_hub.unwatch(subscriber_id, ticket_id)?)
}

pub fn watched_tickets(app_state: &AppState, subscriber_id: &str) -> Vec<TicketId> {
    app_state.sse_hub.watched_tickets(subscriber_id)
}

/// Close a subscriber's stream from the server side.
pub fn disconnect(app_state: &AppState, subscriber_id: &str) -> Result<(), Error> {
    Ok(app_state.sse_hub.disconnect(subscriber_id)?)
}

pub fn history(
    app_state: &AppState,
    ticket_id: Option<TicketId>,
    limit: usize,
) -> Vec<Arc<TicketEvent>> {
    app_state.sse_hub.history(ticket_id, limit)
}

pub fn stats(app_state: &AppState) -> HubStats {
    app_state.sse_hub.stats()
}
