use axum::http::{header, HeaderValue, Method};
use log::*;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
pub mod error;
mod params;
pub mod router;
mod sse;

/// Binds the configured interface and port and serves the API until ctrl-c.
/// On shutdown every open event stream is closed before the server returns.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let host = format!("{}:{}", interface, app_state.config.port);

    info!("Server starting... listening for connections on http://{host}");

    let cors = cors_layer(&app_state);
    let hub = app_state.sse_hub.clone();
    let app = router::define_routes(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&host).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down, closing event streams");
            hub.shutdown();
        })
        .await
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL]);

    if app_state.config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin: {origin}");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::AppState;
    use axum::response::Response;
    use service::config::Config;

    pub(crate) fn test_state(glpi_url: &str) -> AppState {
        let config = Config::with_defaults()
            .set_glpi_url(glpi_url)
            .set_glpi_tokens("app", "user");
        service::init_app_state(config).unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let mut state = test_state("http://127.0.0.1:1");
        state.config.allowed_origins = vec!["http://desk.local".to_string()];
        let app = router::define_routes(state.clone()).layer(cors_layer(&state));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://desk.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://desk.local"
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://elsewhere.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
