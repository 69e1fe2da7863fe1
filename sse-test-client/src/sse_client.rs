use crate::api_client::{ApiClient, TicketId};
use crate::backoff::{Backoff, BackoffPolicy, State};
use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use reqwest::Url;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub type Handler = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Name of the handler that receives events without a dedicated one.
pub const FALLBACK: &str = "*";
const CONNECTED: &str = "connected";

/// Subscriber that keeps its event stream open across failures and restores
/// its watch set on each new connection.
pub struct SubscriberClient {
    api: ApiClient,
    subscriber_id: String,
    watches: BTreeSet<TicketId>,
    handlers: HashMap<String, Handler>,
    policy: BackoffPolicy,
}

impl SubscriberClient {
    pub fn new(api: ApiClient, subscriber_id: impl Into<String>, policy: BackoffPolicy) -> Self {
        Self {
            api,
            subscriber_id: subscriber_id.into(),
            watches: BTreeSet::new(),
            handlers: HashMap::new(),
            policy,
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn on(&mut self, event_type: &str, handler: Handler) {
        self.handlers.insert(event_type.to_string(), handler);
    }

    /// Add a ticket to the watch set. Registered with the server on every connect.
    pub fn watch(&mut self, ticket_id: TicketId) {
        self.watches.insert(ticket_id);
    }

    pub async fn unwatch(&mut self, ticket_id: TicketId) -> Result<()> {
        self.watches.remove(&ticket_id);
        self.api.unwatch(&self.subscriber_id, ticket_id).await
    }

    /// Stream until the retry budget is exhausted.
    pub async fn run(&self) -> Result<()> {
        let mut backoff = Backoff::new(self.policy);

        loop {
            match self.stream_once(&mut backoff).await {
                Ok(()) => info!("Stream for {} ended", self.subscriber_id),
                Err(e) => warn!("Stream for {} failed: {e:#}", self.subscriber_id),
            }

            match backoff.failed() {
                State::Waiting { attempt, delay } => {
                    info!(
                        "Reconnecting {} in {:?} (attempt {})",
                        self.subscriber_id,
                        delay,
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    backoff.retry();
                }
                State::GaveUp => {
                    anyhow::bail!(
                        "Gave up on {} after {} retries",
                        self.subscriber_id,
                        self.policy.max_retries
                    )
                }
                State::Connecting | State::Streaming => {}
            }
        }
    }

    async fn stream_once(&self, backoff: &mut Backoff) -> Result<()> {
        let url = self.stream_url()?;
        debug!("Connecting to {url}");

        let client = es::ClientBuilder::for_url(url.as_str())?
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();
        let mut stream = client.stream();

        while let Some(item) = stream.next().await {
            match item? {
                es::SSE::Event(event) => {
                    if event.event_type == CONNECTED {
                        backoff.connected();
                        self.restore_watches().await;
                    }
                    self.dispatch(&event.event_type, &event.data);
                }
                es::SSE::Comment(_) => {}
            }
        }

        Ok(())
    }

    /// Stream endpoint with the subscriber id query-encoded, the same way the
    /// watch calls send it.
    fn stream_url(&self) -> Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}/sse/stream", self.api.base_url()),
            &[("subscriber_id", self.subscriber_id.as_str())],
        )?;
        Ok(url)
    }

    /// Relations are dropped server side when a stream ends, so each connect
    /// registers the whole set again.
    async fn restore_watches(&self) {
        for ticket_id in &self.watches {
            if let Err(e) = self.api.watch(&self.subscriber_id, *ticket_id).await {
                warn!("{e:#}");
            }
        }
    }

    /// Route a frame to its handler, or the fallback. Undecodable data is skipped.
    fn dispatch(&self, event_type: &str, data: &str) -> bool {
        let data: Value = match serde_json::from_str(data) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping {event_type} event with undecodable data: {e}");
                return false;
            }
        };

        match self
            .handlers
            .get(event_type)
            .or_else(|| self.handlers.get(FALLBACK))
        {
            Some(handler) => {
                handler(event_type, &data);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn client() -> SubscriberClient {
        SubscriberClient::new(
            ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1/api/v1"),
            "u1",
            BackoffPolicy::default(),
        )
    }

    fn recorder(seen: &Arc<Mutex<Vec<String>>>, label: &'static str) -> Handler {
        let seen = seen.clone();
        Box::new(move |event_type, data| {
            seen.lock()
                .unwrap()
                .push(format!("{label}:{event_type}:{data}"));
        })
    }

    #[test]
    fn dispatches_by_name_then_fallback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut client = client();
        client.on("ticket_updated", recorder(&seen, "updated"));
        client.on(FALLBACK, recorder(&seen, "any"));

        assert!(client.dispatch("ticket_updated", r#"{"id":1}"#));
        assert!(client.dispatch("solution_added", r#"{"id":2}"#));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                r#"updated:ticket_updated:{"id":1}"#.to_string(),
                r#"any:solution_added:{"id":2}"#.to_string(),
            ]
        );
    }

    #[test]
    fn undecodable_or_unhandled_events_are_skipped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut client = client();
        client.on("ticket_updated", recorder(&seen, "updated"));

        assert!(!client.dispatch("ticket_updated", "not json"));
        assert!(!client.dispatch("followup_added", "{}"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn stream_url_encodes_the_subscriber_id() {
        let client = SubscriberClient::new(
            ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1/api/v1"),
            "desk a&b",
            BackoffPolicy::default(),
        );

        let url = client.stream_url().unwrap();

        assert_eq!(url.path(), "/api/v1/sse/stream");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("subscriber_id".to_string(), "desk a&b".to_string())]
        );
    }

    #[tokio::test]
    async fn connects_with_an_id_that_needs_encoding() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/sse/stream")
            .match_query(mockito::Matcher::UrlEncoded(
                "subscriber_id".into(),
                "desk a&b".into(),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("event: connected\ndata: {\"subscriber_id\":\"desk a&b\"}\n\n")
            .create_async()
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut client = SubscriberClient::new(
            ApiClient::new(reqwest::Client::new(), &format!("{}/api/v1", server.url())),
            "desk a&b",
            BackoffPolicy::default(),
        );
        client.on("connected", recorder(&seen, "hello"));

        let mut backoff = Backoff::new(BackoffPolicy::default());
        // The stream ends when the body does; only the handshake matters here.
        let _ = client.stream_once(&mut backoff).await;

        mock.assert_async().await;
        assert_eq!(backoff.state(), State::Streaming);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![r#"hello:connected:{"subscriber_id":"desk a&b"}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn unreachable_server_exhausts_retries() {
        let client = SubscriberClient::new(
            ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1/api/v1"),
            "u1",
            BackoffPolicy {
                max_retries: 2,
                base_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(2),
            },
        );

        let err = client.run().await.unwrap_err();
        assert!(err.to_string().contains("Gave up"));
    }
}
