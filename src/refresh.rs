//! Knowledgebase refresh workflow
//!
//! Shows a blocking overlay, fires the refresh webhook, then posts a
//! notification that removes itself after its ttl (five seconds). The
//! overlay is owned by a guard, so it is hidden however the call ends.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::chat::{self, SharedChat};
use crate::client::Webhook;
use crate::credential::Credential;
use crate::transcript::{Notification, Severity};

pub const REFRESH_OK: &str = "Knowledgebase refresh completed successfully!";
pub const REFRESH_FAILED: &str = "Failed to refresh knowledgebase. Please check the log.";

/// Visible overlay; hidden on drop
#[derive(Debug)]
struct Overlay {
    chat: SharedChat,
}

impl Overlay {
    /// None if a refresh is already showing its overlay
    fn show(chat: &SharedChat) -> Option<Self> {
        let mut state = chat::lock(chat);
        if state.overlay {
            return None;
        }
        state.overlay = true;
        Some(Self { chat: chat.clone() })
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        chat::lock(&self.chat).overlay = false;
    }
}

/// Run one refresh. Returns None if one was already running.
pub async fn run(
    chat: &SharedChat,
    webhook: &dyn Webhook,
    credential: &Credential,
) -> Option<Severity> {
    let overlay = Overlay::show(chat)?;
    let result = webhook.refresh_knowledgebase(credential).await;
    drop(overlay);

    let notification = match result {
        Ok(()) => {
            tracing::info!("knowledgebase refresh accepted");
            Notification::new(Severity::Success, REFRESH_OK)
        }
        Err(e) => {
            tracing::error!(error = %e, "knowledgebase refresh failed");
            Notification::new(Severity::Error, REFRESH_FAILED)
        }
    };

    let severity = notification.severity;
    post_expiring(chat, notification);
    Some(severity)
}

/// Spawn [`run`] so the view keeps rendering
pub fn spawn(
    chat: SharedChat,
    webhook: Arc<dyn Webhook>,
    credential: Credential,
) -> JoinHandle<Option<Severity>> {
    tokio::spawn(async move { run(&chat, webhook.as_ref(), &credential).await })
}

/// Post a notification and schedule its removal
fn post_expiring(chat: &SharedChat, notification: Notification) {
    let ttl = notification.ttl;
    let id = chat::lock(chat).transcript.post(notification);

    let chat = chat.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        chat::lock(&chat).transcript.dismiss(id);
    });
}
