//! Capability traits the scheduler core consumes. Implemented by the
//! Discord glue in production and by in-memory doubles in tests.

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of one remote delete attempt. Expected conditions are values,
/// not errors — the executor matches on them explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResult {
    /// The message existed and was deleted.
    Deleted,
    /// The message was already gone.
    MessageMissing,
    /// The containing channel no longer exists.
    ChannelMissing,
    /// The bot is not allowed to delete this message.
    Forbidden,
    /// Network, rate-limit, or server error — worth retrying later.
    Failed(String),
}

/// Deletes messages on the remote chat service.
#[async_trait]
pub trait DeleteCapability: Send + Sync {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> DeleteResult;
}

/// Which audience a notification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAudience {
    /// The operator/admin log channel.
    Operator,
    /// The public radio channel.
    Public,
}

/// Posts operational notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, audience: NotifyAudience, text: &str) -> Result<()>;
}
