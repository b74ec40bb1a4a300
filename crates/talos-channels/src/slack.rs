use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::adapter::*;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Default slash command the bot answers to.
pub const DEFAULT_TRIGGER_WORD: &str = "/talos";

/// Make sure a slash command name starts with `/`.
pub fn normalize_trigger(trigger_word: &str) -> String {
    let trimmed = trigger_word.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Turn a `slash_commands` Socket Mode envelope into an utterance, if the
/// command is ours.
pub fn slash_command_message(
    envelope: &Value,
    trigger_word: &str,
    channel_id: &str,
) -> Option<IncomingMessage> {
    if envelope["type"].as_str() != Some("slash_commands") {
        return None;
    }
    let command = &envelope["payload"];
    let name = command["command"].as_str()?;
    if name != trigger_word {
        debug!(command = %name, "Slack: ignoring other slash command");
        return None;
    }

    let mut metadata = serde_json::Map::new();
    if let Some(url) = command["response_url"].as_str() {
        metadata.insert("response_url".into(), Value::String(url.to_string()));
    }

    Some(IncomingMessage {
        id: envelope["envelope_id"].as_str().unwrap_or_default().to_string(),
        channel: channel_id.to_string(),
        sender: command["user_id"].as_str().unwrap_or_default().to_string(),
        sender_name: command["user_name"].as_str().map(String::from),
        target: command["channel_id"].as_str().unwrap_or_default().to_string(),
        text: command["text"].as_str().unwrap_or_default().trim().to_string(),
        metadata: Value::Object(metadata),
    })
}

/// Slack channel adapter: slash commands over Socket Mode, replies via the
/// command's `response_url` (or the Web API when there is none).
///
/// ## Setup
///
/// 1. Create a Slack App at <https://api.slack.com/apps>
/// 2. Enable **Socket Mode** and generate an App-Level Token (`xapp-...`) with `connections:write`
/// 3. Create the slash command (e.g. `/talos`) and add the `chat:write` and `commands` scopes
/// 4. Install to workspace and copy the Bot Token (`xoxb-...`)
/// 5. Configure in talos.toml:
///    ```toml
///    [channels.slack]
///    app_token = "xapp-..."
///    bot_token = "xoxb-..."
///    trigger_word = "/talos"
///    ```
pub struct SlackChannel {
    id: String,
    app_token: String,
    bot_token: String,
    trigger_word: String,
    client: reqwest::Client,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<tokio::sync::watch::Sender<bool>>,
}

impl SlackChannel {
    pub fn new(id: String, app_token: String, bot_token: String) -> Self {
        Self {
            id,
            app_token,
            bot_token,
            trigger_word: DEFAULT_TRIGGER_WORD.into(),
            client: reqwest::Client::new(),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
        }
    }

    pub fn with_trigger_word(mut self, trigger_word: &str) -> Self {
        self.trigger_word = normalize_trigger(trigger_word);
        self
    }

    pub fn trigger_word(&self) -> &str {
        &self.trigger_word
    }

    async fn post_message(&self, message: &OutgoingMessage) -> talos_core::Result<()> {
        let body = json!({
            "channel": message.target,
            "text": message.text,
        });

        let resp = self
            .client
            .post(format!("{SLACK_API_BASE}/chat.postMessage"))
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| talos_core::TalosError::Channel {
                channel: "slack".into(),
                reason: format!("HTTP error: {e}"),
            })?;

        let data: Value = resp.json().await.unwrap_or_default();
        if !data["ok"].as_bool().unwrap_or(false) {
            let err = data["error"].as_str().unwrap_or("unknown");
            warn!(error = %err, "Slack API error sending message");
            return Err(talos_core::TalosError::Channel {
                channel: "slack".into(),
                reason: format!("Slack API error: {err}"),
            });
        }
        Ok(())
    }

    async fn respond(&self, response_url: &str, text: &str) -> talos_core::Result<()> {
        let resp = self
            .client
            .post(response_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| talos_core::TalosError::Channel {
                channel: "slack".into(),
                reason: format!("HTTP error: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(talos_core::TalosError::Channel {
                channel: "slack".into(),
                reason: format!("response_url returned {status}: {body}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> &str {
        "slack"
    }

    async fn start(&mut self) -> talos_core::Result<mpsc::Receiver<ChannelEvent>> {
        if self.app_token.is_empty() {
            return Err(talos_core::TalosError::Channel {
                channel: "slack".into(),
                reason: "Socket Mode needs an app-level token (xapp-...)".into(),
            });
        }

        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let app_token = self.app_token.clone();
        let trigger_word = self.trigger_word.clone();
        let channel_id = self.id.clone();
        let connected = self.connected.clone();
        let client = self.client.clone();

        info!(trigger = %trigger_word, "Slack: listening for slash command");
        tokio::spawn(async move {
            slack_socket_mode_loop(
                app_token,
                trigger_word,
                channel_id,
                event_tx,
                shutdown_rx,
                connected,
                client,
            )
            .await;
        });

        Ok(event_rx)
    }

    async fn send(&self, message: OutgoingMessage) -> talos_core::Result<()> {
        match message.metadata["response_url"].as_str() {
            Some(url) => self.respond(url, &message.text).await,
            None => self.post_message(&message).await,
        }
    }

    async fn stop(&mut self) -> talos_core::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("Slack channel stopped");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Socket Mode loop: opens a WebSocket to Slack for real-time event delivery.
async fn slack_socket_mode_loop(
    app_token: String,
    trigger_word: String,
    channel_id: String,
    event_tx: mpsc::Sender<ChannelEvent>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    connected: Arc<AtomicBool>,
    client: reqwest::Client,
) {
    let mut backoff = 1u64;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let ws_url = match request_socket_mode_url(&client, &app_token).await {
            Some(url) => url,
            None => {
                error!("Slack: failed to get Socket Mode URL, check your app_token");
                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        info!("Slack: connecting to Socket Mode...");

        let ws_stream = match tokio_tungstenite::connect_async(ws_url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(error = %e, "Slack Socket Mode connection failed");
                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        backoff = 1;
        connected.store(true, Ordering::SeqCst);
        let _ = event_tx.send(ChannelEvent::Connected).await;
        info!("Slack Socket Mode connected");

        let (mut write, mut read) = ws_stream.split();

        let mut ping_timer = tokio::time::interval(std::time::Duration::from_secs(30));
        ping_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        let _ = write.close().await;
                        connected.store(false, Ordering::SeqCst);
                        return;
                    }
                }
                _ = ping_timer.tick() => {
                    let _ = write.send(WsMessage::Ping(Vec::new().into())).await;
                }
                msg = read.next() => {
                    let ws_msg = match msg {
                        Some(Ok(ws_msg)) => ws_msg,
                        Some(Err(e)) => {
                            error!(error = %e, "Slack WebSocket error");
                            break;
                        }
                        None => {
                            info!("Slack: WebSocket stream ended");
                            break;
                        }
                    };
                    if ws_msg.is_close() {
                        info!("Slack: Socket Mode connection closed by server");
                        break;
                    }
                    let Ok(text) = ws_msg.to_text() else {
                        continue;
                    };
                    let Ok(envelope) = serde_json::from_str::<Value>(text) else {
                        continue;
                    };

                    // Slack retries envelopes that are not acknowledged within 3s.
                    if let Some(envelope_id) = envelope["envelope_id"].as_str() {
                        let ack = json!({ "envelope_id": envelope_id });
                        let _ = write.send(WsMessage::Text(ack.to_string().into())).await;
                    }

                    match envelope["type"].as_str().unwrap_or("") {
                        "slash_commands" => {
                            if let Some(incoming) = slash_command_message(&envelope, &trigger_word, &channel_id) {
                                debug!(sender = %incoming.sender, channel = %incoming.target, "Slack slash command received");
                                if event_tx.send(ChannelEvent::Message(incoming)).await.is_err() {
                                    warn!("Slack: event channel closed");
                                    connected.store(false, Ordering::SeqCst);
                                    return;
                                }
                            }
                        }
                        "disconnect" => {
                            let reason = envelope["reason"].as_str().unwrap_or("unknown");
                            info!(reason = %reason, "Slack: server requested disconnect");
                            break;
                        }
                        "hello" => {
                            debug!("Slack: Socket Mode hello");
                        }
                        other => {
                            debug!(msg_type = %other, "Slack: unhandled envelope type");
                        }
                    }
                }
            }
        }

        connected.store(false, Ordering::SeqCst);
        let _ = event_tx
            .send(ChannelEvent::Disconnected(Some(
                "Socket Mode connection lost".into(),
            )))
            .await;

        if *shutdown_rx.borrow() {
            break;
        }

        info!(retry_in = backoff, "Slack: reconnecting...");
        tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(60);
    }
}

/// Request a Socket Mode WebSocket URL via apps.connections.open.
async fn request_socket_mode_url(client: &reqwest::Client, app_token: &str) -> Option<String> {
    let resp = client
        .post(format!("{SLACK_API_BASE}/apps.connections.open"))
        .header("Authorization", format!("Bearer {app_token}"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .send()
        .await
        .ok()?;

    let data: Value = resp.json().await.ok()?;
    if !data["ok"].as_bool().unwrap_or(false) {
        let err = data["error"].as_str().unwrap_or("unknown");
        error!(error = %err, "Slack apps.connections.open failed");
        return None;
    }

    data["url"].as_str().map(|s| s.to_string())
}
