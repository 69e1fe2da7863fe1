//! This module holds typed parameters for various endpoint inputs.
//!
//! By using typed parameters, inputs are validated (by type) before they reach
//! the domain layer. Request bodies for ticket mutations and the search filter
//! are the domain's own `domain::ticket` types and are not repeated here.

pub(crate) mod sse;
pub(crate) mod ticket;
