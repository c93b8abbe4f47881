//! Message relay — anonymized repost, admin mirror, and the deferred
//! deletion of the repost.

use std::sync::Arc;

use airwave_channels::discord::{CreateMessage, DiscordRestClient};
use airwave_channels::embeds;
use airwave_core::config::{DiscordConfig, SweepConfig};
use airwave_core::traits::{DeleteCapability, DeleteResult};
use airwave_core::types::IncomingMessage;
use airwave_scheduler::{ActionId, DeferredAction, SweepService};
use chrono::{Duration, Utc};

pub struct Relay {
    rest: Arc<DiscordRestClient>,
    service: Arc<SweepService>,
    discord: DiscordConfig,
    retention: Duration,
}

impl Relay {
    pub fn new(
        rest: Arc<DiscordRestClient>,
        service: Arc<SweepService>,
        discord: DiscordConfig,
        sweep: &SweepConfig,
    ) -> Self {
        Self {
            rest,
            service,
            discord,
            retention: Duration::hours(sweep.retention_hours as i64),
        }
    }

    /// Handle one message-creation event from the gateway.
    pub async fn handle_message(&self, msg: IncomingMessage) {
        if msg.author_is_bot || msg.channel_id != self.discord.radio_channel_id {
            return;
        }

        // Shouldn't be possible to send an empty message, but better safe
        // than sorry.
        let content = if msg.content.is_empty() {
            "(Empty message)"
        } else {
            msg.content.as_str()
        };

        // Repost first — the original only comes down once the anonymized
        // copy is up.
        let radio = CreateMessage::embed(embeds::radio_embed(content));
        let reposted = match self
            .rest
            .create_message(self.discord.radio_channel_id, &radio)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to repost radio message: {e}");
                return;
            }
        };

        // Take the original down, best-effort.
        match self.rest.delete_message(msg.channel_id, msg.message_id).await {
            DeleteResult::Deleted | DeleteResult::MessageMissing => {}
            other => tracing::warn!(
                "Could not remove original message {}: {other:?}",
                msg.message_id
            ),
        }

        // Attributed mirror for the admin log.
        let mirror = CreateMessage::embed(embeds::admin_log_embed(
            &msg.author_name,
            msg.author_id,
            content,
        ));
        if let Err(e) = self
            .rest
            .create_message(self.discord.admin_channel_id, &mirror)
            .await
        {
            tracing::warn!("Admin log mirror failed: {e}");
        }

        // The repost comes down after the retention window. A backend
        // failure here has already escalated inside the service.
        let action = DeferredAction::new(
            ActionId::new(reposted, self.discord.radio_channel_id),
            Utc::now() + self.retention,
        );
        let _ = self.service.schedule(action).await;
    }
}
