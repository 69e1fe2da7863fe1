use serde::Serialize;

pub(crate) mod health_check_controller;
pub(crate) mod session_controller;
pub(crate) mod sse_controller;
pub(crate) mod ticket_controller;

/// JSON envelope for controller responses: `{status_code, data}`, with `data`
/// left out when there is nothing to return.
#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self {
            status_code,
            data: Some(data),
        }
    }

    pub fn no_content(status_code: u16) -> ApiResponse<()> {
        ApiResponse {
            status_code,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn watched_tickets_are_wrapped_with_status_code() {
        let state = test_state("http://127.0.0.1:1");
        state.sse_hub.watch("u1", 9).unwrap();
        state.sse_hub.watch("u1", 3).unwrap();

        let response = define_routes(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sse/watch?subscriber_id=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            body_json(response).await,
            json!({"status_code": 200, "data": [3, 9]})
        );
    }

    #[tokio::test]
    async fn terminating_without_a_session_has_no_data_field() {
        let response = define_routes(test_state("http://127.0.0.1:1"))
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/v1/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_json(response).await, json!({"status_code": 200}));
    }
}
