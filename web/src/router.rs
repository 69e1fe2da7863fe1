use crate::controller::{
    health_check_controller, session_controller, sse_controller, ticket_controller,
};
use crate::{sse::handler::sse_handler, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

const API_PREFIX: &str = "/api/v1";

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .nest(
            API_PREFIX,
            Router::new()
                .merge(health_routes())
                .merge(sse_routes(app_state.clone()))
                .merge(ticket_routes(app_state.clone()))
                .merge(session_routes(app_state)),
        )
        .merge(health_routes())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/stream", get(sse_handler))
        .route("/sse/watch", get(sse_controller::watched))
        .route("/sse/watch/:ticket_id", post(sse_controller::watch))
        .route("/sse/watch/:ticket_id", delete(sse_controller::unwatch))
        .route(
            "/sse/connections/:subscriber_id",
            delete(sse_controller::disconnect),
        )
        .route("/sse/history", get(sse_controller::history))
        .route("/sse/stats", get(sse_controller::stats))
        .with_state(app_state)
}

fn ticket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/tickets", get(ticket_controller::index))
        .route("/tickets", post(ticket_controller::create))
        .route("/tickets/:id", get(ticket_controller::read))
        .route("/tickets/:id", put(ticket_controller::update))
        .route(
            "/tickets/:id/followups",
            post(ticket_controller::create_followup),
        )
        .route(
            "/tickets/:id/solutions",
            post(ticket_controller::create_solution),
        )
        .with_state(app_state)
}

fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/session", get(session_controller::status))
        .route("/session", delete(session_controller::terminate))
        .with_state(app_state)
}
