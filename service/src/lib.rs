use config::Config;
use events::EventPublisher;
use glpi_auth::error::config_error;
use glpi_auth::http::HttpClientBuilder;
use glpi_auth::{Credentials, GlpiAuthClient, GlpiSessionManager};
use log::info;
use sse::domain_event_handler::SseDomainEventHandler;
use sse::{Hub, HubConfig};
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub session_manager: Arc<GlpiSessionManager>,
    pub event_publisher: EventPublisher,
    pub sse_hub: Arc<Hub>,
}

impl AppState {
    /// Wire the event publisher so every domain event reaches the hub.
    pub fn new(
        config: Config,
        http_client: reqwest::Client,
        session_manager: Arc<GlpiSessionManager>,
        sse_hub: Arc<Hub>,
    ) -> Self {
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(Arc::clone(&sse_hub))));
        Self {
            config,
            http_client,
            session_manager,
            event_publisher,
            sse_hub,
        }
    }

    pub fn glpi_url(&self) -> Result<&str, glpi_auth::Error> {
        self.config
            .glpi_url()
            .map_err(|e| config_error(&e.to_string()))
    }
}

/// Build the shared HTTP client, the session manager and the hub from configuration.
///
/// No upstream call is made here; the first session is opened lazily.
pub fn init_app_state(config: Config) -> Result<AppState, glpi_auth::Error> {
    let glpi_url = config
        .glpi_url()
        .map_err(|e| config_error(&e.to_string()))?;
    let credentials = Credentials::new(
        config
            .glpi_app_token()
            .map_err(|e| config_error(&e.to_string()))?,
        config
            .glpi_user_token()
            .map_err(|e| config_error(&e.to_string()))?,
    );

    let http_client = HttpClientBuilder::new()
        .with_timeout(config.upstream_timeout())
        .with_user_agent(format!("glpi_notify/{}", env!("CARGO_PKG_VERSION")))
        .build()?;
    let auth_client = GlpiAuthClient::new(http_client.clone(), glpi_url);
    let session_manager = Arc::new(GlpiSessionManager::new(
        auth_client,
        credentials,
        config.session_lifetime(),
    ));

    let sse_hub = Arc::new(Hub::new(HubConfig {
        channel_capacity: config.sse_channel_capacity,
        history_capacity: config.event_history_capacity,
        max_watches_per_subscriber: config.sse_max_watches,
    }));

    info!(
        "Upstream {} (session lifetime {}s), SSE channel capacity {}, history {}",
        glpi_url,
        config.session_lifetime_secs,
        config.sse_channel_capacity,
        config.event_history_capacity
    );

    Ok(AppState::new(config, http_client, session_manager, sse_hub))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_requires_upstream_settings() {
        let result = init_app_state(Config::with_defaults().set_glpi_tokens("app", "user"));
        // GLPI_URL may be set in the environment running the tests.
        if Config::with_defaults().glpi_url().is_err() {
            let err = result.err().expect("missing url must fail");
            assert_eq!(err.error_kind, glpi_auth::ErrorKind::Config);
        }
    }

    #[test]
    fn state_publishes_into_its_hub() {
        let config = Config::with_defaults()
            .set_glpi_url("http://127.0.0.1:1/")
            .set_glpi_tokens("app", "user");
        let state = init_app_state(config).unwrap();

        assert_eq!(state.event_publisher.handler_count(), 1);
        assert_eq!(state.glpi_url().unwrap(), "http://127.0.0.1:1");
        assert_eq!(state.sse_hub.stats().connected_subscribers, 0);
    }
}
