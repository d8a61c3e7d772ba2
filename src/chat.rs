//! Chat view state shared between the render loop and in-flight workflows
//!
//! Everything runs on one runtime; the mutex only hands the state back
//! and forth between the render loop and the task awaiting the webhook.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::input::InputBox;
use crate::transcript::Transcript;

/// Where the message exchange currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    Sending,
    AwaitingReply,
    Error,
}

impl ExchangePhase {
    pub fn in_flight(&self) -> bool {
        !matches!(self, ExchangePhase::Idle)
    }
}

#[derive(Debug, Default)]
pub struct ChatState {
    pub transcript: Transcript,
    pub input: InputBox,
    pub phase: ExchangePhase,
    /// Refresh overlay; blocks the rest of the view while shown
    pub overlay: bool,
}

pub type SharedChat = Arc<Mutex<ChatState>>;

pub fn shared() -> SharedChat {
    Arc::new(Mutex::new(ChatState::default()))
}

/// Lock the view state. A panic elsewhere never leaves the view unusable.
pub fn lock(chat: &SharedChat) -> MutexGuard<'_, ChatState> {
    chat.lock().unwrap_or_else(PoisonError::into_inner)
}
