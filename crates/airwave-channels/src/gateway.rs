//! Discord gateway event source — a WebSocket session that yields
//! message-creation events as a stream.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use airwave_core::error::{AirwaveError, Result};
use airwave_core::types::IncomingMessage;
use chrono::Utc;
use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const API_BASE: &str = "https://discord.com/api/v10";

/// GUILD_MESSAGES + MESSAGE_CONTENT intents.
const INTENTS: u64 = (1 << 9) | (1 << 15);

const OP_DISPATCH: i64 = 0;
const OP_HEARTBEAT: i64 = 1;
const OP_IDENTIFY: i64 = 2;
const OP_RECONNECT: i64 = 7;
const OP_INVALID_SESSION: i64 = 9;
const OP_HELLO: i64 = 10;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Discord gateway connection manager.
pub struct DiscordGateway {
    token: String,
    client: reqwest::Client,
}

impl DiscordGateway {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the wss URL from the REST API.
    async fn gateway_url(&self) -> Result<String> {
        let resp = self
            .client
            .get(format!("{API_BASE}/gateway/bot"))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| AirwaveError::Channel(format!("gateway lookup failed: {e}")))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AirwaveError::Channel(format!("invalid gateway response: {e}")))?;
        body["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AirwaveError::Channel("gateway response missing url".into()))
    }

    /// Run one gateway session until the socket closes. Returns `true`
    /// when the receiver side was dropped — the caller should stop
    /// reconnecting.
    async fn run_session(&self, tx: &mpsc::UnboundedSender<IncomingMessage>) -> Result<bool> {
        let url = format!("{}/?v=10&encoding=json", self.gateway_url().await?);
        tracing::info!("🔌 Connecting to Discord gateway");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| AirwaveError::Channel(format!("WebSocket connect failed: {e}")))?;
        let (mut write, mut read) = ws_stream.split();

        // HELLO carries the heartbeat cadence.
        let heartbeat_ms = loop {
            match read.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let payload: serde_json::Value = serde_json::from_str(&text)
                        .map_err(|e| AirwaveError::Channel(format!("invalid HELLO: {e}")))?;
                    if payload["op"].as_i64() == Some(OP_HELLO) {
                        break payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41_250);
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(AirwaveError::Channel(format!("WebSocket error: {e}")));
                }
                None => return Err(AirwaveError::Channel("gateway closed before HELLO".into())),
            }
        };

        let identify = serde_json::json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token,
                "intents": INTENTS,
                "properties": {"os": "linux", "browser": "airwave", "device": "airwave"},
            },
        });
        write
            .send(WsMessage::Text(identify.to_string()))
            .await
            .map_err(|e| AirwaveError::Channel(format!("identify failed: {e}")))?;

        let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_ms));
        let mut seq: Option<i64> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = serde_json::json!({"op": OP_HEARTBEAT, "d": seq});
                    write
                        .send(WsMessage::Text(beat.to_string()))
                        .await
                        .map_err(|e| AirwaveError::Channel(format!("heartbeat failed: {e}")))?;
                }
                frame = read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let payload: serde_json::Value = match serde_json::from_str(&text) {
                            Ok(v) => v,
                            Err(e) => {
                                tracing::warn!("Unparseable gateway frame: {e}");
                                continue;
                            }
                        };
                        match payload["op"].as_i64().unwrap_or(-1) {
                            OP_DISPATCH => {
                                if let Some(s) = payload["s"].as_i64() {
                                    seq = Some(s);
                                }
                                match payload["t"].as_str() {
                                    Some("READY") => {
                                        let user = payload["d"]["user"]["username"]
                                            .as_str()
                                            .unwrap_or("unknown");
                                        tracing::info!("📡 Gateway ready as {user}");
                                    }
                                    Some("MESSAGE_CREATE") => {
                                        if let Some(msg) = parse_message_create(&payload["d"])
                                            && tx.send(msg).is_err() {
                                                tracing::info!(
                                                    "Gateway listener stopped (receiver dropped)"
                                                );
                                                return Ok(true);
                                            }
                                    }
                                    _ => {}
                                }
                            }
                            OP_HEARTBEAT => {
                                let beat = serde_json::json!({"op": OP_HEARTBEAT, "d": seq});
                                write
                                    .send(WsMessage::Text(beat.to_string()))
                                    .await
                                    .map_err(|e| {
                                        AirwaveError::Channel(format!("heartbeat failed: {e}"))
                                    })?;
                            }
                            OP_RECONNECT | OP_INVALID_SESSION => {
                                tracing::info!("Gateway asked for a new session");
                                return Ok(false);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        tracing::info!("Gateway closed: {frame:?}");
                        return Ok(false);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(AirwaveError::Channel(format!("WebSocket error: {e}")));
                    }
                    None => return Ok(false),
                }
            }
        }
    }

    /// Spawn the gateway loop — reconnects with a delay until the
    /// returned stream is dropped.
    pub fn start(self) -> GatewayStream {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match self.run_session(&tx).await {
                    Ok(true) => break,
                    Ok(false) => tracing::info!("Gateway session ended; reconnecting"),
                    Err(e) => tracing::error!("Gateway error: {e}"),
                }
                if tx.is_closed() {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
            tracing::info!("🔌 Gateway listener stopped");
        });

        GatewayStream { rx }
    }
}

/// Convert a MESSAGE_CREATE dispatch into an `IncomingMessage`.
fn parse_message_create(d: &serde_json::Value) -> Option<IncomingMessage> {
    let message_id = d["id"].as_str()?.parse().ok()?;
    let channel_id = d["channel_id"].as_str()?.parse().ok()?;
    let author = &d["author"];
    let author_id = author["id"].as_str()?.parse().ok()?;

    Some(IncomingMessage {
        message_id,
        channel_id,
        author_id,
        author_name: author["username"].as_str().unwrap_or("unknown").to_string(),
        author_is_bot: author["bot"].as_bool().unwrap_or(false),
        content: d["content"].as_str().unwrap_or_default().to_string(),
        timestamp: d["timestamp"]
            .as_str()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
    })
}

/// Stream of incoming messages from the gateway session.
pub struct GatewayStream {
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for GatewayStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for GatewayStream {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_create() {
        let d = serde_json::json!({
            "id": "111222333",
            "channel_id": "444555666",
            "content": "hello radio",
            "timestamp": "2026-08-01T12:00:00+00:00",
            "author": {"id": "777", "username": "listener", "bot": false},
        });
        let msg = parse_message_create(&d).unwrap();
        assert_eq!(msg.message_id, 111_222_333);
        assert_eq!(msg.channel_id, 444_555_666);
        assert_eq!(msg.author_id, 777);
        assert_eq!(msg.author_name, "listener");
        assert!(!msg.author_is_bot);
        assert_eq!(msg.content, "hello radio");
    }

    #[test]
    fn test_parse_flags_bot_authors() {
        let d = serde_json::json!({
            "id": "1",
            "channel_id": "2",
            "content": "",
            "author": {"id": "3", "username": "airwave", "bot": true},
        });
        let msg = parse_message_create(&d).unwrap();
        assert!(msg.author_is_bot);
        assert_eq!(msg.content, "");
    }

    #[test]
    fn test_parse_rejects_missing_ids() {
        let d = serde_json::json!({"content": "no ids here"});
        assert!(parse_message_create(&d).is_none());
    }
}
