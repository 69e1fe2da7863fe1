use crate::message::TicketEventType;
use crate::Hub;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler, HandlerError};
use log::*;
use std::sync::Arc;

/// Handles domain events by publishing them to the hub for the ticket's watchers.
///
/// The gateway decides what happened to which ticket; this handler only maps
/// the mutation onto its wire event type and hands the payload over unchanged.
pub struct SseDomainEventHandler {
    hub: Arc<Hub>,
}

impl SseDomainEventHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let (event_type, payload) = match event {
            DomainEvent::TicketCreated { ticket, .. } => (TicketEventType::TicketCreated, ticket),
            DomainEvent::TicketUpdated { ticket, .. } => (TicketEventType::TicketUpdated, ticket),
            DomainEvent::FollowupAdded { followup, .. } => {
                (TicketEventType::FollowupAdded, followup)
            }
            DomainEvent::SolutionAdded { solution, .. } => {
                (TicketEventType::SolutionAdded, solution)
            }
        };

        debug!(
            "Handling {} event for ticket {}",
            event_type,
            event.ticket_id()
        );

        self.hub
            .publish(event.ticket_id(), event_type, payload.clone())
            .map(|_| ())
            .map_err(|e| Box::new(e) as HandlerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{EventName, Message};
    use events::EventPublisher;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn domain_events_reach_watchers_with_wire_names() {
        let hub = Arc::new(Hub::default());
        let publisher =
            EventPublisher::new().with_handler(Arc::new(SseDomainEventHandler::new(hub.clone())));

        let mut stream = hub.subscribe("u1").unwrap();
        hub.watch("u1", 12).unwrap();

        publisher
            .publish(DomainEvent::FollowupAdded {
                ticket_id: 12,
                followup: json!({"id": 3, "content": "on it"}),
            })
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().event_name(), "connected");
        let Some(Message::Ticket(event)) = stream.next().await else {
            panic!("expected a ticket event");
        };
        assert_eq!(event.ticket_id, 12);
        assert_eq!(event.event_type, TicketEventType::FollowupAdded);
        assert_eq!(event.payload["content"], "on it");
    }

    #[tokio::test]
    async fn closed_hub_is_reported_as_handler_failure() {
        let hub = Arc::new(Hub::default());
        hub.shutdown();
        let handler = SseDomainEventHandler::new(hub);

        let result = handler
            .handle(&DomainEvent::TicketCreated {
                ticket_id: 1,
                ticket: json!({"id": 1}),
            })
            .await;

        assert!(result.is_err());
    }
}
