use crate::controller::ApiResponse;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::session as SessionApi;

use log::*;

/// GET the state of the upstream session
pub async fn status(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let status = SessionApi::status(&app_state).await;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// DELETE revoke the upstream session; the next mutation opens a new one
pub async fn terminate(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    info!("DELETE upstream session");
    SessionApi::terminate(&app_state).await;
    Ok(Json(ApiResponse::<()>::no_content(StatusCode::OK.into())))
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn status_reports_no_session_before_first_mutation() {
        let response = define_routes(test_state("http://127.0.0.1:1"))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["active"], false);
    }

    #[tokio::test]
    async fn health_is_served_without_prefix() {
        let response = define_routes(test_state("http://127.0.0.1:1"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
