//! Transcript: the ordered, append-only list the chat view displays
//!
//! Messages are never reordered or removed. The only entries that can
//! disappear are transient ones: the single "awaiting reply" placeholder
//! and self-expiring notifications.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// How long a notification stays visible
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    /// Assistant text is rich (markdown); user text is shown literally
    pub fn is_rich(&self) -> bool {
        matches!(self, Origin::Assistant)
    }
}

/// A message in the conversation (immutable once created)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            origin: Origin::User,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            origin: Origin::Assistant,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// Transient status line posted by the refresh workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub text: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            text: text.into(),
            ttl: NOTIFICATION_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(Message),
    /// "Awaiting reply" indicator
    Progress,
    Notice(Notification),
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Message(m) => Some(m),
            _ => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Notice(n) => Some(n),
            _ => None,
        })
    }

    pub fn push_message(&mut self, message: Message) {
        self.entries.push(Entry::Message(message));
    }

    pub fn has_progress(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Progress))
    }

    /// Append the placeholder. Returns false if one is already shown.
    pub fn show_progress(&mut self) -> bool {
        if self.has_progress() {
            return false;
        }
        self.entries.push(Entry::Progress);
        true
    }

    pub fn clear_progress(&mut self) {
        self.entries.retain(|e| !matches!(e, Entry::Progress));
    }

    pub fn post(&mut self, notification: Notification) -> Uuid {
        let id = notification.id;
        self.entries.push(Entry::Notice(notification));
        id
    }

    /// Drop an expired notification. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e, Entry::Notice(n) if n.id == id));
        self.entries.len() != before
    }
}
