use glpi_auth::SessionStatus;
use service::AppState;

/// Whether an upstream session is open and how long it has left. Never calls upstream.
pub async fn status(app_state: &AppState) -> SessionStatus {
    app_state.session_manager.status().await
}

/// Revoke the upstream session. Revocation failures are logged, not returned.
pub async fn terminate(app_state: &AppState) {
    app_state.session_manager.terminate().await
}
