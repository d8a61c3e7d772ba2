//! Session-scoped credential store
//!
//! Holds one opaque token for the lifetime of the process. Nothing here is
//! ever written to disk: quitting the client ends the session.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Opaque basic-auth token: base64 of `username:password`
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Encode a username/password pair
    pub fn from_login(username: &str, password: &str) -> Self {
        Self {
            token: STANDARD.encode(format!("{}:{}", username, password)),
        }
    }

    /// Wrap an already-encoded token
    pub fn from_token(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

/// Single-slot store shared by the login and chat views
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, credential: Credential) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    pub fn get(&self) -> Option<Credential> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_base64_of_pair() {
        let cred = Credential::from_login("alice", "s3cret");
        assert_eq!(cred.token(), "YWxpY2U6czNjcmV0");
        assert_eq!(cred.header_value(), "Basic YWxpY2U6czNjcmV0");
    }

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::from_login("alice", "s3cret");
        let shown = format!("{:?}", cred);
        assert!(!shown.contains("YWxp"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn test_store_starts_empty() {
        let store = CredentialStore::new();
        assert!(store.get().is_none());
        store.set(Credential::from_token("abc"));
        assert_eq!(store.get().unwrap().token(), "abc");
    }
}
