//! Domain layer of the ticket notifier.
//!
//! Ticket mutations go through `gateway::glpi::TicketGateway`, which publishes a
//! `DomainEvent` for each successful one. Watch management and diagnostics are
//! thin wrappers over the `sse` hub that translate its errors into `error::Error`.

pub use events::TicketId;

pub mod error;
pub mod gateway;
pub mod session;
pub mod subscription;
pub mod ticket;
