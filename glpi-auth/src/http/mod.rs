//! HTTP client building for upstream callers.

mod client;

pub use client::{HttpClientBuilder, HttpClientConfig};
