use crate::connection::{ConnectionId, SubscriberId};
use crate::hub::Shared;
use crate::message::{Message, TicketEvent};
use chrono::Utc;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::Receiver;

/// One subscriber's stream of `Message`s.
///
/// Dropping it (for instance when the HTTP client goes away) unregisters the
/// connection and removes the subscriber's watch relations.
pub struct Subscription {
    subscriber_id: SubscriberId,
    connection_id: ConnectionId,
    greeting: Option<Message>,
    receiver: Receiver<Arc<TicketEvent>>,
    hub: Arc<Shared>,
}

impl Subscription {
    pub(crate) fn new(
        subscriber_id: SubscriberId,
        connection_id: ConnectionId,
        receiver: Receiver<Arc<TicketEvent>>,
        hub: Arc<Shared>,
    ) -> Self {
        let greeting = Message::Connected {
            subscriber_id: subscriber_id.clone(),
            timestamp: Utc::now(),
        };
        Self {
            subscriber_id,
            connection_id,
            greeting: Some(greeting),
            receiver,
            hub,
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(greeting) = this.greeting.take() {
            return Poll::Ready(Some(greeting));
        }
        this.receiver.poll_recv(cx).map(|event| event.map(Message::Ticket))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(&self.subscriber_id, &self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::hub::Hub;
    use crate::message::EventName;
    use futures::StreamExt;

    #[tokio::test]
    async fn drop_unregisters_the_connection() {
        let hub = Hub::default();
        let mut subscription = hub.subscribe("u1").unwrap();
        assert_eq!(subscription.subscriber_id(), "u1");
        assert_eq!(
            subscription.next().await.map(|m| m.event_name()),
            Some("connected")
        );

        drop(subscription);
        assert!(!hub.is_connected("u1"));
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber_id", &self.subscriber_id)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}
