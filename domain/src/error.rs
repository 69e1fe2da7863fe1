//! Error types for the `domain` layer.
use glpi_auth::error::{AuthErrorKind, Error as GlpiAuthError, ErrorKind as GlpiAuthErrorKind, HttpErrorKind};
use sse::error::{Error as SseError, ErrorKind as SseErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Each lower layer (`glpi-auth`, `sse`) keeps its own error kinds;
/// `web` only ever sees the kinds defined here and maps them to HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Subscription(SubscriptionErrorKind),
    Config,
    Other(String),
}

/// Errors bubbling up from the event hub, reduced to what callers can act on.
#[derive(Debug, PartialEq)]
pub enum SubscriptionErrorKind {
    DuplicateSubscriber,
    NotWatching,
    NotConnected,
    Closed,
    WatchLimitReached,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The upstream refused or could not issue a session. Carries the HTTP status when known.
    Authentication(Option<u16>),
    /// A non-auth upstream request failed. Carries the HTTP status when known.
    Upstream(Option<u16>),
    Network,
    Other(String),
}

impl Error {
    pub(crate) fn internal(kind: InternalErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(kind),
        }
    }

    pub(crate) fn external(kind: ExternalErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::External(kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {:?}", self.error_kind)?;
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

// This is where we translate errors from the `sse` layer to the `domain` layer.
impl From<SseError> for Error {
    fn from(err: SseError) -> Self {
        let kind = match err.error_kind {
            SseErrorKind::DuplicateSubscriber => SubscriptionErrorKind::DuplicateSubscriber,
            SseErrorKind::NotWatching => SubscriptionErrorKind::NotWatching,
            SseErrorKind::SubscriberNotConnected => SubscriptionErrorKind::NotConnected,
            SseErrorKind::HubClosed => SubscriptionErrorKind::Closed,
            SseErrorKind::WatchLimitReached => SubscriptionErrorKind::WatchLimitReached,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Subscription(kind)),
        }
    }
}

impl From<GlpiAuthError> for Error {
    fn from(err: GlpiAuthError) -> Self {
        let error_kind = match &err.error_kind {
            GlpiAuthErrorKind::Authentication(AuthErrorKind::Rejected(status)) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication(Some(*status)))
            }
            GlpiAuthErrorKind::Authentication(AuthErrorKind::Unreachable) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            GlpiAuthErrorKind::Authentication(_) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication(None))
            }
            GlpiAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build HTTP client".to_string()),
            ),
            GlpiAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            GlpiAuthErrorKind::Config => DomainErrorKind::Internal(InternalErrorKind::Config),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else if err.is_decode() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid upstream response body".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}
