//! Session gate
//!
//! The only way into the chat view is a login probe the webhook accepts.
//! The chat view checks the store once when it loads; a credential that
//! goes bad later surfaces as a failed send, not as a forced logout.

use std::sync::Arc;

use crate::client::{VerifyOutcome, Webhook};
use crate::credential::{Credential, CredentialStore};

pub const MISSING_FIELDS: &str = "Please enter both username and password.";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";
pub const CANNOT_CONNECT: &str = "Could not connect to the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Authenticated,
}

/// What the login view shows after a submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    MissingFields,
    Rejected,
    Unreachable,
}

impl LoginOutcome {
    /// Error line for the login view, if any
    pub fn message(&self) -> Option<&'static str> {
        match self {
            LoginOutcome::Authenticated => None,
            LoginOutcome::MissingFields => Some(MISSING_FIELDS),
            LoginOutcome::Rejected => Some(INVALID_CREDENTIALS),
            LoginOutcome::Unreachable => Some(CANNOT_CONNECT),
        }
    }
}

/// Result of loading the chat view
#[derive(Debug)]
pub enum ChatEntry {
    Granted(Credential),
    RedirectToLogin,
}

#[derive(Debug, Clone)]
pub struct SessionGate {
    store: Arc<CredentialStore>,
}

impl SessionGate {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub fn state(&self) -> GateState {
        match self.store.get() {
            Some(_) => GateState::Authenticated,
            None => GateState::Unauthenticated,
        }
    }

    /// Login view submit. Stores the credential only on an accepted probe.
    pub async fn login(&self, webhook: &dyn Webhook, username: &str, password: &str) -> LoginOutcome {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return LoginOutcome::MissingFields;
        }

        match webhook.verify(username, password).await {
            VerifyOutcome::Accepted(credential) => {
                self.store.set(credential);
                tracing::info!("login accepted");
                LoginOutcome::Authenticated
            }
            VerifyOutcome::Rejected { status } => {
                tracing::warn!(status, "login rejected");
                LoginOutcome::Rejected
            }
            VerifyOutcome::Unreachable => LoginOutcome::Unreachable,
        }
    }

    /// Checked once when the chat view loads
    pub fn enter_chat(&self) -> ChatEntry {
        match self.store.get() {
            Some(credential) => ChatEntry::Granted(credential),
            None => {
                tracing::info!("no credential, redirecting to login");
                ChatEntry::RedirectToLogin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        outcome: VerifyOutcome,
        calls: AtomicUsize,
    }

    impl Probe {
        fn new(outcome: VerifyOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Webhook for Probe {
        async fn verify(&self, _: &str, _: &str) -> VerifyOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }

        async fn send_message(&self, _: &Credential, _: &str) -> Result<String, RemoteError> {
            Err(RemoteError::Network("unused".into()))
        }

        async fn refresh_knowledgebase(&self, _: &Credential) -> Result<(), RemoteError> {
            Err(RemoteError::Network("unused".into()))
        }
    }

    fn gate() -> SessionGate {
        SessionGate::new(Arc::new(CredentialStore::new()))
    }

    #[tokio::test]
    async fn test_accepted_login_stores_credential() {
        let gate = gate();
        let probe = Probe::new(VerifyOutcome::Accepted(Credential::from_login("a", "b")));

        assert_eq!(gate.login(&probe, "a", "b").await, LoginOutcome::Authenticated);
        assert_eq!(gate.state(), GateState::Authenticated);
        assert!(matches!(gate.enter_chat(), ChatEntry::Granted(c) if !c.token().is_empty()));
    }

    #[tokio::test]
    async fn test_rejected_and_unreachable_leave_store_empty() {
        for (outcome, expected) in [
            (VerifyOutcome::Rejected { status: 401 }, LoginOutcome::Rejected),
            (VerifyOutcome::Unreachable, LoginOutcome::Unreachable),
        ] {
            let gate = gate();
            let probe = Probe::new(outcome);
            assert_eq!(gate.login(&probe, "a", "b").await, expected);
            assert_eq!(gate.state(), GateState::Unauthenticated);
            assert!(matches!(gate.enter_chat(), ChatEntry::RedirectToLogin));
        }
    }

    #[tokio::test]
    async fn test_blank_fields_skip_the_probe() {
        let gate = gate();
        let probe = Probe::new(VerifyOutcome::Accepted(Credential::from_login("a", "b")));

        assert_eq!(gate.login(&probe, "  ", "b").await, LoginOutcome::MissingFields);
        assert_eq!(gate.login(&probe, "a", "").await, LoginOutcome::MissingFields);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(LoginOutcome::MissingFields.message(), Some(MISSING_FIELDS));
    }

    #[test]
    fn test_distinct_failure_messages() {
        assert_ne!(LoginOutcome::Rejected.message(), LoginOutcome::Unreachable.message());
        assert!(LoginOutcome::Authenticated.message().is_none());
    }
}
