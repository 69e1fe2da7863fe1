use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    SubscriptionErrorKind,
};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Subscription(subscription_error_kind) => {
                    match subscription_error_kind {
                        SubscriptionErrorKind::DuplicateSubscriber => {
                            (StatusCode::BAD_REQUEST, "ALREADY CONNECTED").into_response()
                        }
                        SubscriptionErrorKind::NotWatching => {
                            (StatusCode::NOT_FOUND, "NOT WATCHING").into_response()
                        }
                        SubscriptionErrorKind::NotConnected => {
                            (StatusCode::NOT_FOUND, "NOT CONNECTED").into_response()
                        }
                        SubscriptionErrorKind::Closed => {
                            (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
                        }
                        SubscriptionErrorKind::WatchLimitReached => {
                            (StatusCode::TOO_MANY_REQUESTS, "TOO MANY WATCHED TICKETS")
                                .into_response()
                        }
                    }
                }
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    error!("{message}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::External(external_error_kind) => {
                warn!("{message}");
                match external_error_kind {
                    ExternalErrorKind::Upstream(Some(status))
                        if (400..500).contains(&status) =>
                    {
                        // Caller mistakes (unknown ticket, invalid field) keep their status.
                        let status =
                            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                        (status, "UPSTREAM REJECTED REQUEST").into_response()
                    }
                    ExternalErrorKind::Authentication(_)
                    | ExternalErrorKind::Upstream(_)
                    | ExternalErrorKind::Network
                    | ExternalErrorKind::Other(_) => {
                        (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                    }
                }
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
