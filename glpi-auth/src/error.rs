//! Error types for the `glpi-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for glpi-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in glpi-auth.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Authentication(AuthErrorKind),
    Http(HttpErrorKind),
    Config,
}

/// Errors from session issue and revoke operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthErrorKind {
    /// The auth endpoint answered with a non-success status.
    Rejected(u16),
    /// The auth endpoint answered 2xx but the body was not usable.
    InvalidResponse,
    /// The auth endpoint could not be reached.
    Unreachable,
    /// The session could not be revoked upstream.
    RevocationFailed,
}

/// Errors from HTTP client operations.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// Upstream HTTP status attached to this error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self.error_kind {
            ErrorKind::Authentication(AuthErrorKind::Rejected(status)) => Some(status),
            _ => None,
        }
    }

    /// Whether this is an authentication failure, as opposed to a transport or config problem.
    pub fn is_authentication(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Authentication(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Authentication(kind) => write!(f, "Authentication error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
            ErrorKind::Config => write!(f, "Configuration error")?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create authentication errors.
pub fn auth_error(kind: AuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Authentication(kind),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_error_exposes_upstream_status() {
        let err = auth_error(AuthErrorKind::Rejected(401), "bad user token");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_authentication());
        assert!(err.to_string().contains("bad user token"));
    }

    #[test]
    fn config_error_is_not_authentication() {
        let err = config_error("GLPI_URL missing");
        assert_eq!(err.status(), None);
        assert!(!err.is_authentication());
    }
}
