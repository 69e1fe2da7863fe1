//! In-memory holder of the current session token.

use std::time::Duration;

use secrecy::SecretString;
use tokio::time::Instant;

use super::{Credentials, Token};

/// Holds the current token, its lifetime window and the credentials needed to
/// mint a replacement.
///
/// Owned exclusively by `SessionManager`, which serializes every write.
#[derive(Debug)]
pub struct TokenStore {
    credentials: Credentials,
    lifetime: Duration,
    current: Option<Token>,
}

impl TokenStore {
    pub fn new(credentials: Credentials, lifetime: Duration) -> Self {
        Self {
            credentials,
            lifetime,
            current: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The current token, even if it has already expired.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// The current token if it is still usable at `now`.
    pub fn valid_token(&self, now: Instant) -> Option<&Token> {
        self.current.as_ref().filter(|token| !token.is_expired_at(now))
    }

    /// Store a freshly issued token value, replacing any previous one.
    pub fn install(&mut self, value: SecretString) -> Token {
        let token = Token::new(value, self.lifetime);
        self.current = Some(token.clone());
        token
    }

    /// Remove and return the current token.
    pub fn take(&mut self) -> Option<Token> {
        self.current.take()
    }

    /// Clear the current token only if it is still `stale`.
    /// Returns whether anything was cleared.
    pub fn clear_if_same(&mut self, stale: &Token) -> bool {
        match &self.current {
            Some(current) if current.same_session(stale) => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn store() -> TokenStore {
        TokenStore::new(Credentials::new("app", "user"), Duration::from_secs(3600))
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_is_not_valid_but_still_current() {
        let mut store = store();
        store.install(SecretString::new("t1".to_string()));

        tokio::time::advance(Duration::from_secs(3600)).await;

        assert!(store.valid_token(Instant::now()).is_none());
        assert!(store.current().is_some());
    }

    #[test]
    fn clear_if_same_ignores_a_newer_token() {
        let mut store = store();
        let old = store.install(SecretString::new("old".to_string()));
        store.install(SecretString::new("new".to_string()));

        assert!(!store.clear_if_same(&old));
        assert_eq!(store.current().unwrap().expose(), "new");
    }

    #[test]
    fn clear_if_same_removes_the_current_token() {
        let mut store = store();
        let token = store.install(SecretString::new("t".to_string()));

        assert!(store.clear_if_same(&token));
        assert!(store.current().is_none());
    }

    #[test]
    fn take_leaves_the_store_empty() {
        let mut store = store();
        store.install(SecretString::new("t".to_string()));

        let taken = store.take().unwrap();
        assert_eq!(taken.secret().expose_secret(), "t");
        assert!(store.take().is_none());
    }
}
