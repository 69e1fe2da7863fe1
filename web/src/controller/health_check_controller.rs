use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET router liveness. Does not touch the upstream API.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
