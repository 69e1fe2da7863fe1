//! Session token lifecycle: storage, expiry and single-flight renewal.

mod manager;
mod store;
mod token;

pub use manager::{SessionManager, SessionStatus};
pub use store::TokenStore;
pub use token::{Credentials, Token};
