//! # glpi-auth
//!
//! Single source of truth for the upstream ticketing API session:
//! - Session token lifecycle (lazy issue, expiry, single-flight renewal, teardown)
//! - The `AuthClient` capability and its GLPI REST implementation
//! - HTTP client building shared by every upstream caller
//!
//! ## Architecture
//!
//! Exactly one session token is current per process. Callers never handle
//! expiry themselves: they call `SessionManager::ensure_valid()` before every
//! upstream request and get back a token that has not expired.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glpi_auth::{http::HttpClientBuilder, GlpiAuthClient, SessionManager, Credentials};
//!
//! let http = HttpClientBuilder::new().build()?;
//! let client = GlpiAuthClient::new(http, "https://glpi.example.com");
//! let sessions = SessionManager::new(client, credentials, Duration::from_secs(3600));
//! let token = sessions.ensure_valid().await?;
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod session;

// Re-export commonly used types
pub use client::{AuthClient, GlpiAuthClient};
pub use error::{Error, ErrorKind};
pub use session::{Credentials, SessionManager, SessionStatus, Token};

/// Session manager wired to the GLPI REST API.
pub type GlpiSessionManager = SessionManager<GlpiAuthClient>;
