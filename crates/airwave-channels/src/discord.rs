//! Discord REST channel — message posting, deletion, and operator notices.

use airwave_core::config::DiscordConfig;
use airwave_core::error::{AirwaveError, Result};
use airwave_core::traits::{DeleteCapability, DeleteResult, Notifier, NotifyAudience};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embeds::Embed;

const API_BASE: &str = "https://discord.com/api/v10";

/// API error codes we classify on.
const ERR_UNKNOWN_CHANNEL: i64 = 10003;

/// Discord REST API client. One instance is shared by the relay (posting
/// and deleting), the scheduler's executor (`DeleteCapability`), and the
/// escalation controller (`Notifier`).
pub struct DiscordRestClient {
    config: DiscordConfig,
    client: reqwest::Client,
}

/// Payload for creating a message.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl CreateMessage {
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

/// The bot's own identity, from `/users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

impl DiscordRestClient {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{API_BASE}{path}")
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.config.bot_token)
    }

    /// Verify the token and fetch the bot identity.
    pub async fn connect(&self) -> Result<BotUser> {
        let resp = self
            .client
            .get(self.url("/users/@me"))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| AirwaveError::Channel(format!("identity check failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AirwaveError::Channel(format!(
                "identity check rejected: HTTP {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| AirwaveError::Channel(format!("invalid identity response: {e}")))
    }

    /// Post a message; returns the new message's id.
    pub async fn create_message(&self, channel_id: u64, payload: &CreateMessage) -> Result<u64> {
        let resp = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", self.auth())
            .json(payload)
            .send()
            .await
            .map_err(|e| AirwaveError::Channel(format!("send to {channel_id} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AirwaveError::Channel(format!(
                "send to {channel_id} rejected: HTTP {status}: {body}"
            )));
        }

        let message: MessageRef = resp
            .json()
            .await
            .map_err(|e| AirwaveError::Channel(format!("invalid send response: {e}")))?;
        message
            .id
            .parse()
            .map_err(|_| AirwaveError::Channel(format!("non-numeric message id {:?}", message.id)))
    }

    /// Delete a message, classifying the outcome instead of erroring:
    /// not-found and forbidden are expected conditions the caller matches
    /// on, not failures.
    pub async fn delete_message_classified(&self, channel_id: u64, message_id: u64) -> DeleteResult {
        let resp = match self
            .client
            .delete(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("Authorization", self.auth())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return DeleteResult::Failed(format!("request failed: {e}")),
        };

        let status = resp.status();
        match status.as_u16() {
            204 => DeleteResult::Deleted,
            404 => {
                let err: Option<ApiError> = resp.json().await.ok();
                match err.and_then(|e| e.code) {
                    Some(ERR_UNKNOWN_CHANNEL) => DeleteResult::ChannelMissing,
                    _ => DeleteResult::MessageMissing,
                }
            }
            403 => DeleteResult::Forbidden,
            _ => {
                let detail = resp
                    .json::<ApiError>()
                    .await
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or_default();
                DeleteResult::Failed(format!("HTTP {status}: {detail}"))
            }
        }
    }
}

#[async_trait]
impl DeleteCapability for DiscordRestClient {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> DeleteResult {
        self.delete_message_classified(channel_id, message_id).await
    }
}

#[async_trait]
impl Notifier for DiscordRestClient {
    async fn notify(&self, audience: NotifyAudience, text: &str) -> Result<()> {
        let channel_id = match audience {
            NotifyAudience::Operator => self.config.admin_channel_id,
            NotifyAudience::Public => self.config.radio_channel_id,
        };
        self.create_message(channel_id, &CreateMessage::text(text)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_message_serialization() {
        let payload = CreateMessage::text("hello");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hello"}));

        let payload = CreateMessage::embed(crate::embeds::radio_embed("hi"));
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["embeds"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_api_error_parses_partial_bodies() {
        let err: ApiError = serde_json::from_str(r#"{"code": 10008}"#).unwrap();
        assert_eq!(err.code, Some(10008));
        assert!(err.message.is_none());

        let err: ApiError = serde_json::from_str(r#"{}"#).unwrap();
        assert!(err.code.is_none());
    }
}
