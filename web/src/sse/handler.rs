use crate::params::sse::SubscriberParams;
use crate::{AppState, Error};
use async_stream::stream;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use domain::subscription as SubscriptionApi;
use futures::{Stream, StreamExt};
use log::*;
use std::convert::Infallible;

/// SSE handler that opens the long-lived event stream for one subscriber.
/// The first frame is `connected`; then one frame per event on a watched ticket.
/// A subscriber id already holding a stream is rejected with 400.
pub(crate) async fn sse_handler(
    State(app_state): State<AppState>,
    Query(params): Query<SubscriberParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    debug!(
        "Establishing SSE connection for subscriber {}",
        params.subscriber_id
    );

    let mut subscription = SubscriptionApi::subscribe(&app_state, &params.subscriber_id)?;
    let subscriber_id = params.subscriber_id;

    // Dropping the stream (client went away) drops the subscription, which
    // unregisters the connection and its watch relations.
    let stream = stream! {
        while let Some(message) = subscription.next().await {
            match message.to_sse_event() {
                Ok(event) => yield Ok::<Event, Infallible>(event),
                Err(e) => warn!("Skipping unserializable event for {subscriber_id}: {e}"),
            }
        }
        debug!("SSE stream ended for subscriber {subscriber_id}");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(app_state.config.sse_keep_alive())))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use serde_json::json;
    use tower::ServiceExt;

    async fn next_chunk(body: &mut (impl futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin)) -> String {
        let chunk = body.next().await.expect("stream ended").expect("body error");
        String::from_utf8(chunk.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stream_starts_with_connected_then_watched_events() {
        let state = test_state("http://127.0.0.1:1");
        let app = crate::router::define_routes(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sse/stream?subscriber_id=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let connected = next_chunk(&mut body).await;
        assert!(connected.contains("event: connected"));
        assert!(connected.contains("\"subscriber_id\":\"u1\""));

        state.sse_hub.watch("u1", 42).unwrap();
        state
            .sse_hub
            .publish(
                42,
                sse::message::TicketEventType::TicketUpdated,
                json!({"status": "closed"}),
            )
            .unwrap();

        let update = next_chunk(&mut body).await;
        assert!(update.contains("event: ticket_updated"));
        assert!(update.contains("data: {\"status\":\"closed\"}"));

        drop(body);
        assert!(!state.sse_hub.is_connected("u1"));
        assert!(state.sse_hub.watched_tickets("u1").is_empty());
    }

    #[tokio::test]
    async fn second_stream_for_same_subscriber_is_rejected() {
        let state = test_state("http://127.0.0.1:1");
        let _first = state.sse_hub.subscribe("u1").unwrap();

        let response = crate::router::define_routes(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sse/stream?user_id=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
