//! SSE HTTP handler for the web layer.
//!
//! The hub, subscriptions and message types live in the `sse` crate; this
//! module only adapts a subscription into an axum event stream.

pub mod handler;
