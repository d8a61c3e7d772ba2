//! Message exchange state machine
//!
//! One round trip per submitted message:
//!
//!   Idle → Sending → AwaitingReply → Idle            (reply)
//!   Idle → Sending → AwaitingReply → Error → Idle    (failure)
//!
//! The input is locked by an [`InputLock`] guard. Dropping the guard is
//! the only way back to `Idle`, so the input comes back on every exit
//! path, including a panicking or aborted task.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::chat::{self, ExchangePhase, SharedChat};
use crate::client::Webhook;
use crate::credential::Credential;
use crate::transcript::Message;

/// Shown instead of the error detail when a send fails
pub const APOLOGY: &str = "Sorry, an error occurred. Please try again.";

/// Result of pressing "send"
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Draft was empty or whitespace; nothing changed
    Empty,
    /// Another exchange is in flight. Rejected, never queued.
    Busy,
    Started(PendingExchange),
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Replied,
    Apologized,
}

/// Capture the draft and move to `AwaitingReply`.
///
/// The user message and the placeholder are in the transcript before this
/// returns, i.e. before any network call is made.
pub fn submit(chat: &SharedChat) -> SubmitOutcome {
    let mut state = chat::lock(chat);

    if state.phase.in_flight() || !state.input.is_enabled() {
        return SubmitOutcome::Busy;
    }

    let text = state.input.text().trim().to_string();
    if text.is_empty() {
        return SubmitOutcome::Empty;
    }

    state.phase = ExchangePhase::Sending;
    state.input.take_and_disable();
    state.transcript.push_message(Message::user(text.clone()));

    state.transcript.show_progress();
    state.phase = ExchangePhase::AwaitingReply;
    drop(state);

    tracing::debug!(chars = text.chars().count(), "message submitted");

    SubmitOutcome::Started(PendingExchange {
        text,
        lock: InputLock {
            chat: chat.clone(),
            settled: false,
        },
    })
}

/// An accepted submission waiting for its webhook call
#[derive(Debug)]
pub struct PendingExchange {
    text: String,
    lock: InputLock,
}

impl PendingExchange {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Call the webhook and settle the transcript
    pub async fn run(mut self, webhook: &dyn Webhook, credential: &Credential) -> Settlement {
        let result = webhook.send_message(credential, &self.text).await;

        let mut state = chat::lock(&self.lock.chat);
        state.transcript.clear_progress();

        let settlement = match result {
            Ok(reply) => {
                state.transcript.push_message(Message::assistant(reply));
                Settlement::Replied
            }
            Err(e) => {
                tracing::warn!(error = %e, "message send failed");
                state.phase = ExchangePhase::Error;
                state.transcript.push_message(Message::assistant(APOLOGY));
                Settlement::Apologized
            }
        };
        drop(state);

        self.lock.settled = true;
        settlement
    }

    /// Run on the runtime so the view keeps rendering while we wait
    pub fn spawn(self, webhook: Arc<dyn Webhook>, credential: Credential) -> JoinHandle<Settlement> {
        tokio::spawn(async move { self.run(webhook.as_ref(), &credential).await })
    }
}

/// Keeps the input disabled while alive
#[derive(Debug)]
struct InputLock {
    chat: SharedChat,
    settled: bool,
}

impl Drop for InputLock {
    fn drop(&mut self) {
        let mut state = chat::lock(&self.chat);

        if !self.settled {
            tracing::error!("message exchange dropped before settling");
            state.transcript.clear_progress();
            state.transcript.push_message(Message::assistant(APOLOGY));
        }

        state.input.enable_and_focus();
        state.phase = ExchangePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RemoteError, VerifyOutcome};
    use crate::transcript::{Entry, Origin};
    use async_trait::async_trait;

    /// Replies with a canned answer, checking the view mid-flight
    struct Canned {
        chat: SharedChat,
        reply: Result<String, RemoteError>,
    }

    #[async_trait]
    impl Webhook for Canned {
        async fn verify(&self, _: &str, _: &str) -> VerifyOutcome {
            VerifyOutcome::Unreachable
        }

        async fn send_message(&self, _: &Credential, _: &str) -> Result<String, RemoteError> {
            let state = chat::lock(&self.chat);
            assert!(!state.input.is_enabled());
            assert_eq!(state.phase, ExchangePhase::AwaitingReply);
            assert!(state.transcript.has_progress());
            self.reply.clone()
        }

        async fn refresh_knowledgebase(&self, _: &Credential) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn with_draft(text: &str) -> SharedChat {
        let chat = chat::shared();
        chat::lock(&chat).input.set_text(text);
        chat
    }

    fn cred() -> Credential {
        Credential::from_token("abc")
    }

    #[test]
    fn test_whitespace_draft_is_noop() {
        let chat = with_draft("  \n\t ");
        assert!(matches!(submit(&chat), SubmitOutcome::Empty));

        let state = chat::lock(&chat);
        assert!(state.transcript.is_empty());
        assert!(state.input.is_enabled());
        assert_eq!(state.phase, ExchangePhase::Idle);
    }

    #[test]
    fn test_submit_appends_user_message_and_placeholder() {
        let chat = with_draft("  hello  ");
        let pending = match submit(&chat) {
            SubmitOutcome::Started(p) => p,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(pending.text(), "hello");

        {
            let state = chat::lock(&chat);
            assert_eq!(state.input.text(), "");
            assert!(!state.input.is_enabled());
            let entries = state.transcript.entries();
            assert_eq!(entries.len(), 2);
            assert!(matches!(&entries[0], Entry::Message(m) if m.body == "hello" && m.origin == Origin::User));
            assert_eq!(entries[1], Entry::Progress);
        }

        drop(pending);
    }

    #[test]
    fn test_second_submit_is_rejected() {
        let chat = with_draft("first");
        let pending = submit(&chat);
        chat::lock(&chat).input.set_text("second");

        assert!(matches!(submit(&chat), SubmitOutcome::Busy));
        assert_eq!(chat::lock(&chat).transcript.messages().count(), 1);
        drop(pending);
    }

    #[tokio::test]
    async fn test_reply_replaces_placeholder() {
        let chat = with_draft("hello");
        let hook = Canned {
            chat: chat.clone(),
            reply: Ok("hi there".into()),
        };

        let SubmitOutcome::Started(pending) = submit(&chat) else {
            panic!("submission not started");
        };
        assert_eq!(pending.run(&hook, &cred()).await, Settlement::Replied);

        let state = chat::lock(&chat);
        assert!(!state.transcript.has_progress());
        let last = state.transcript.messages().last().unwrap();
        assert_eq!(last.body, "hi there");
        assert_eq!(last.origin, Origin::Assistant);
        assert!(state.input.is_enabled() && state.input.is_focused());
        assert_eq!(state.phase, ExchangePhase::Idle);
    }

    #[tokio::test]
    async fn test_failure_appends_apology_not_detail() {
        let chat = with_draft("hello");
        let hook = Canned {
            chat: chat.clone(),
            reply: Err(RemoteError::Status(502)),
        };

        let SubmitOutcome::Started(pending) = submit(&chat) else {
            panic!("submission not started");
        };
        assert_eq!(pending.run(&hook, &cred()).await, Settlement::Apologized);

        let state = chat::lock(&chat);
        let bodies: Vec<_> = state.transcript.messages().map(|m| m.body.clone()).collect();
        assert_eq!(bodies, ["hello", APOLOGY]);
        assert!(!bodies.iter().any(|b| b.contains("502")));
        assert!(state.input.is_enabled());
        assert_eq!(state.phase, ExchangePhase::Idle);
    }

    #[test]
    fn test_abandoned_exchange_still_unlocks() {
        let chat = with_draft("hello");
        let pending = submit(&chat);
        drop(pending);

        let state = chat::lock(&chat);
        assert!(state.input.is_enabled());
        assert!(!state.transcript.has_progress());
        assert_eq!(state.transcript.messages().last().unwrap().body, APOLOGY);
    }
}
