use crate::controller::ApiResponse;
use crate::params::sse::{HistoryParams, SubscriberParams};
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::subscription as SubscriptionApi;
use domain::TicketId;
use serde::Serialize;

use log::*;

#[derive(Debug, Serialize)]
struct WatchResponse {
    status: &'static str,
    message: String,
    ticket_id: TicketId,
}

/// POST start watching a ticket. Idempotent.
pub async fn watch(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<TicketId>,
    Query(params): Query<SubscriberParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "POST watch ticket {ticket_id} for subscriber {}",
        params.subscriber_id
    );

    SubscriptionApi::watch(&app_state, &params.subscriber_id, ticket_id)?;

    Ok(Json(WatchResponse {
        status: "success",
        message: format!("Now watching ticket {ticket_id}"),
        ticket_id,
    }))
}

/// DELETE stop watching a ticket. 404 if the subscriber was not watching it.
pub async fn unwatch(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<TicketId>,
    Query(params): Query<SubscriberParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "DELETE watch ticket {ticket_id} for subscriber {}",
        params.subscriber_id
    );

    SubscriptionApi::unwatch(&app_state, &params.subscriber_id, ticket_id)?;

    Ok(Json(WatchResponse {
        status: "success",
        message: format!("No longer watching ticket {ticket_id}"),
        ticket_id,
    }))
}

/// GET the tickets a subscriber is watching.
pub async fn watched(
    State(app_state): State<AppState>,
    Query(params): Query<SubscriberParams>,
) -> Result<impl IntoResponse, Error> {
    let tickets = SubscriptionApi::watched_tickets(&app_state, &params.subscriber_id);
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), tickets)))
}

/// DELETE close a subscriber's stream from the server side.
pub async fn disconnect(
    State(app_state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    info!("DELETE connection of subscriber {subscriber_id}");

    SubscriptionApi::disconnect(&app_state, &subscriber_id)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET recently published events, oldest first.
pub async fn history(
    State(app_state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, Error> {
    let events: Vec<_> = SubscriptionApi::history(&app_state, params.ticket_id, params.limit())
        .iter()
        .map(|event| event.as_ref().clone())
        .collect();

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), events)))
}

pub async fn stats(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        SubscriptionApi::stats(&app_state),
    )))
}
