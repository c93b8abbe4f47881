//! Shared message types.

use chrono::{DateTime, Utc};

/// A message-creation event delivered by the chat gateway.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
