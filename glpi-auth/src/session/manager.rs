//! Session manager with single-flight renewal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::{Credentials, Token, TokenStore};
use crate::client::AuthClient;
use crate::error::{Error, ErrorKind};

/// Snapshot of the session state for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_in_secs: Option<u64>,
}

/// Outcome of the last renewal attempt that failed, replayed to callers that
/// were waiting on it.
#[derive(Debug, Clone)]
struct FailedRenewal {
    kind: ErrorKind,
    // Message of the underlying cause only; the kind is rendered by `Error`.
    message: Option<String>,
}

impl FailedRenewal {
    fn from_error(err: &Error) -> Self {
        Self {
            kind: err.error_kind.clone(),
            message: err.source.as_ref().map(|source| source.to_string()),
        }
    }

    fn to_error(&self) -> Error {
        Error {
            source: self.message.clone().map(Into::into),
            error_kind: self.kind.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct RenewalState {
    last_failure: Option<FailedRenewal>,
}

/// Maintains exactly one valid session token for the upstream API.
///
/// Reads are served from the token store without contention. Renewal is a
/// critical section guarded by `renewal`: only one request to the auth
/// endpoint is in flight at a time and callers that queued behind it reuse its
/// result, whether it succeeded or failed.
pub struct SessionManager<C: AuthClient> {
    client: C,
    store: RwLock<TokenStore>,
    renewal: Mutex<RenewalState>,
    // Completed renewal attempts, successful or not.
    attempts: AtomicU64,
}

impl<C: AuthClient> SessionManager<C> {
    /// Create a manager that mints tokens valid for `lifetime`.
    pub fn new(client: C, credentials: Credentials, lifetime: Duration) -> Self {
        Self {
            client,
            store: RwLock::new(TokenStore::new(credentials, lifetime)),
            renewal: Mutex::new(RenewalState::default()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return a usable token, minting a new one if there is none or it expired.
    ///
    /// Fails with an authentication error carrying the upstream status when the
    /// auth endpoint refuses or cannot be reached. Nothing is cached on failure
    /// and no retry is attempted.
    pub async fn ensure_valid(&self) -> Result<Token, Error> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.renewal.lock().await;

        // Another caller may have renewed while we waited for the lock.
        if let Some(token) = self.cached().await {
            return Ok(token);
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(failure) = &state.last_failure {
                debug!("Reusing the result of a renewal that failed while waiting");
                return Err(failure.to_error());
            }
        }

        let credentials = self.store.read().await.credentials().clone();
        let result = self.client.issue(&credentials).await;
        self.attempts.fetch_add(1, Ordering::Release);

        match result {
            Ok(value) => {
                state.last_failure = None;
                let token = self.store.write().await.install(value);
                info!(
                    "Upstream session renewed, valid for {}s",
                    token.time_until_expiry().as_secs()
                );
                Ok(token)
            }
            Err(e) => {
                error!("Failed to renew upstream session: {e}");
                state.last_failure = Some(FailedRenewal::from_error(&e));
                Err(e)
            }
        }
    }

    /// Drop `stale` if it is still the current token, so that the next
    /// `ensure_valid()` mints a fresh one. A newer token is left untouched.
    pub async fn invalidate(&self, stale: &Token) {
        if self.store.write().await.clear_if_same(stale) {
            info!("Upstream session invalidated after rejection");
        }
    }

    /// Revoke the current session upstream and clear local state.
    ///
    /// Local state is cleared even when revocation fails; the failure is only logged.
    pub async fn terminate(&self) {
        let _state = self.renewal.lock().await;

        let (token, credentials) = {
            let mut store = self.store.write().await;
            (store.take(), store.credentials().clone())
        };

        let Some(token) = token else {
            debug!("No upstream session to terminate");
            return;
        };

        match self.client.revoke(&credentials, token.secret()).await {
            Ok(()) => info!("Upstream session terminated"),
            Err(e) => warn!("Failed to revoke upstream session, dropping it locally: {e}"),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let store = self.store.read().await;
        match store.valid_token(Instant::now()) {
            Some(token) => SessionStatus {
                active: true,
                issued_at: Some(token.issued_at()),
                expires_in_secs: Some(token.time_until_expiry().as_secs()),
            },
            None => SessionStatus {
                active: false,
                issued_at: None,
                expires_in_secs: None,
            },
        }
    }

    async fn cached(&self) -> Option<Token> {
        self.store
            .read()
            .await
            .valid_token(Instant::now())
            .cloned()
    }
}
