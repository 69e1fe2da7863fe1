use axum::response::sse::Event;
use chrono::{DateTime, SecondsFormat, Utc};
use events::TicketId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::connection::SubscriberId;

/// Trait for getting the SSE event name
pub trait EventName {
    fn event_name(&self) -> &'static str;
}

/// The closed set of ticket mutations pushed to watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketEventType {
    TicketCreated,
    TicketUpdated,
    FollowupAdded,
    SolutionAdded,
}

impl EventName for TicketEventType {
    fn event_name(&self) -> &'static str {
        match self {
            TicketEventType::TicketCreated => "ticket_created",
            TicketEventType::TicketUpdated => "ticket_updated",
            TicketEventType::FollowupAdded => "followup_added",
            TicketEventType::SolutionAdded => "solution_added",
        }
    }
}

impl fmt::Display for TicketEventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// An immutable ticket event as published to the hub.
#[derive(Debug, Clone, Serialize)]
pub struct TicketEvent {
    pub ticket_id: TicketId,
    pub event_type: TicketEventType,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl TicketEvent {
    pub fn new(ticket_id: TicketId, event_type: TicketEventType, payload: Value) -> Self {
        Self {
            ticket_id,
            event_type,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// An item yielded by a subscriber's stream.
#[derive(Debug, Clone)]
pub enum Message {
    /// Always the first item of a stream.
    Connected {
        subscriber_id: SubscriberId,
        timestamp: DateTime<Utc>,
    },
    Ticket(Arc<TicketEvent>),
}

impl EventName for Message {
    fn event_name(&self) -> &'static str {
        match self {
            Message::Connected { .. } => "connected",
            Message::Ticket(event) => event.event_type.event_name(),
        }
    }
}

impl Message {
    /// The JSON body of the frame. Ticket frames carry the published payload as-is.
    pub fn data(&self) -> Value {
        match self {
            Message::Connected {
                subscriber_id,
                timestamp,
            } => json!({
                "message": "Connected to ticket event stream",
                "subscriber_id": subscriber_id,
                "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
            Message::Ticket(event) => event.payload.clone(),
        }
    }

    /// Render as an SSE frame: `event:` is the event name, `data:` the JSON body.
    pub fn to_sse_event(&self) -> Result<Event, serde_json::Error> {
        let data = serde_json::to_string(&self.data())?;
        Ok(Event::default().event(self.event_name()).data(data))
    }
}
