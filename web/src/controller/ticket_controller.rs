use crate::controller::ApiResponse;
use crate::params::ticket::ReadParams;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::ticket::{self as TicketApi, NewFollowup, NewSolution, NewTicket, TicketFilter};
use domain::TicketId;
use serde_json::{Map, Value};

use log::*;

/// GET a single ticket with dropdowns expanded
pub async fn read(
    State(app_state): State<AppState>,
    Path(id): Path<TicketId>,
    Query(params): Query<ReadParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Ticket by id: {id}");

    let ticket = TicketApi::get(&app_state, id, params.with_logs).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), ticket)))
}

/// GET search tickets by status, category and requester
pub async fn index(
    State(app_state): State<AppState>,
    Query(filter): Query<TicketFilter>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Search Tickets: {filter:?}");

    let result = TicketApi::search(&app_state, &filter).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), result)))
}

/// POST create a new ticket upstream
pub async fn create(
    State(app_state): State<AppState>,
    Json(ticket): Json<NewTicket>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Ticket: {}", ticket.name);

    let result = TicketApi::create(&app_state, ticket).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), result)),
    ))
}

/// PUT update fields of a ticket
pub async fn update(
    State(app_state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Update Ticket with id: {id}");

    let result = TicketApi::update(&app_state, id, fields).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), result)))
}

/// POST add a followup to a ticket
pub async fn create_followup(
    State(app_state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(followup): Json<NewFollowup>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Followup for Ticket with id: {id}");

    let result = TicketApi::add_followup(&app_state, id, followup).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), result)),
    ))
}

/// POST add a solution to a ticket
pub async fn create_solution(
    State(app_state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(solution): Json<NewSolution>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Solution for Ticket with id: {id}");

    let result = TicketApi::add_solution(&app_state, id, solution).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), result)),
    ))
}
