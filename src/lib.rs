//! hookchat - terminal chat client for a basic-auth automation webhook
//!
//! The login view probes the webhook and keeps the resulting credential
//! in memory for the rest of the run. The chat view exchanges one message
//! at a time with the webhook and can trigger a knowledgebase refresh.

pub mod chat;
pub mod client;
pub mod config;
pub mod credential;
pub mod exchange;
pub mod gate;
pub mod input;
pub mod logging;
pub mod refresh;
pub mod transcript;
pub mod ui;
