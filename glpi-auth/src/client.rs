//! Upstream auth capability and its GLPI REST implementation.

use async_trait::async_trait;
use log::*;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{auth_error, AuthErrorKind, Error};
use crate::session::Credentials;

/// Header carrying the application identifier on every GLPI call.
pub const APP_TOKEN_HEADER: &str = "App-Token";
/// Header carrying the current session token on every authenticated GLPI call.
pub const SESSION_TOKEN_HEADER: &str = "Session-Token";

/// Issues and revokes upstream session tokens.
///
/// Implementations perform exactly one upstream request per call: they never
/// retry and never cache.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Mint a new session token from the long-lived credentials.
    async fn issue(&self, credentials: &Credentials) -> Result<SecretString, Error>;

    /// Revoke a session token upstream.
    async fn revoke(&self, credentials: &Credentials, session_token: &SecretString)
        -> Result<(), Error>;
}

#[derive(Debug, Deserialize)]
struct InitSessionResponse {
    session_token: Option<String>,
}

/// GLPI `initSession` / `killSession` client.
pub struct GlpiAuthClient {
    client: Client,
    base_url: String,
}

impl GlpiAuthClient {
    /// `base_url` is the GLPI root, e.g. `https://glpi.example.com`.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/apirest.php/{}", self.base_url, name)
    }
}

#[async_trait]
impl AuthClient for GlpiAuthClient {
    async fn issue(&self, credentials: &Credentials) -> Result<SecretString, Error> {
        let url = self.endpoint("initSession");
        debug!("Requesting new GLPI session from {url}");

        let response = self
            .client
            .get(&url)
            .header(APP_TOKEN_HEADER, credentials.app_token.expose_secret())
            .header(
                "Authorization",
                format!("user_token {}", credentials.user_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| {
                warn!("GLPI auth endpoint unreachable: {e}");
                auth_error(AuthErrorKind::Unreachable, &e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("GLPI refused to open a session: {status} - {body}");
            return Err(auth_error(
                AuthErrorKind::Rejected(status.as_u16()),
                &format!("initSession failed with {status}: {body}"),
            ));
        }

        let body: InitSessionResponse = response.json().await.map_err(|e| {
            auth_error(
                AuthErrorKind::InvalidResponse,
                &format!("initSession response could not be decoded: {e}"),
            )
        })?;

        body.session_token
            .filter(|token| !token.is_empty())
            .map(SecretString::new)
            .ok_or_else(|| {
                auth_error(
                    AuthErrorKind::InvalidResponse,
                    "initSession response has no session_token",
                )
            })
    }

    async fn revoke(
        &self,
        credentials: &Credentials,
        session_token: &SecretString,
    ) -> Result<(), Error> {
        let url = self.endpoint("killSession");

        let response = self
            .client
            .get(&url)
            .header(APP_TOKEN_HEADER, credentials.app_token.expose_secret())
            .header(SESSION_TOKEN_HEADER, session_token.expose_secret())
            .send()
            .await
            .map_err(|e| auth_error(AuthErrorKind::Unreachable, &e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(auth_error(
                AuthErrorKind::RevocationFailed,
                &format!("killSession failed with {status}: {body}"),
            ))
        }
    }
}
