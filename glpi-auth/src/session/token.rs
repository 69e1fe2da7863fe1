//! Session token and credential types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

/// Long-lived credentials used to mint session tokens.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Application identifier sent as `App-Token`.
    pub app_token: SecretString,
    /// Long-lived user credential sent as `Authorization: user_token ...`.
    pub user_token: SecretString,
}

impl Credentials {
    pub fn new(app_token: &str, user_token: &str) -> Self {
        Self {
            app_token: SecretString::new(app_token.to_string()),
            user_token: SecretString::new(user_token.to_string()),
        }
    }
}

/// A session token with its validity window.
///
/// Expiry is tracked on the monotonic clock so that wall-clock adjustments
/// never extend or shorten a session.
#[derive(Debug, Clone)]
pub struct Token {
    value: SecretString,
    issued_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Token {
    pub(crate) fn new(value: SecretString, lifetime: Duration) -> Self {
        Self {
            value,
            issued_at: Utc::now(),
            expires_at: Instant::now() + lifetime,
        }
    }

    pub fn secret(&self) -> &SecretString {
        &self.value
    }

    /// The raw token value, for use in the `Session-Token` header.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Remaining validity, zero once expired.
    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Whether both tokens carry the same upstream session.
    pub fn same_session(&self, other: &Token) -> bool {
        self.value.expose_secret() == other.value.expose_secret()
    }
}
