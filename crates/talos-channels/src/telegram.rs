use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapter::*;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Default command the bot answers to (`/talos ...`).
pub const DEFAULT_TRIGGER_WORD: &str = "talos";

/// Who may talk to the bot and how they call it.
#[derive(Debug, Clone)]
pub struct TelegramAccess {
    pub trigger_word: String,
    pub restricted: bool,
    pub white_list: Vec<i64>,
}

impl Default for TelegramAccess {
    fn default() -> Self {
        Self {
            trigger_word: DEFAULT_TRIGGER_WORD.into(),
            restricted: false,
            white_list: Vec::new(),
        }
    }
}

impl TelegramAccess {
    pub fn is_allowed(&self, user_id: i64) -> bool {
        !self.restricted || self.white_list.contains(&user_id)
    }
}

/// Reply sent to users outside the white list.
pub fn access_denied(user_id: i64) -> String {
    format!("Access denied for user with ID {user_id}")
}

/// Extract the utterance from a `/<trigger> args...` command.
///
/// The command may be addressed as `/<trigger>@BotName`; when the bot's own
/// username is known, commands addressed to other bots are ignored. The
/// arguments are joined by single spaces.
pub fn parse_command(text: &str, trigger_word: &str, bot_username: Option<&str>) -> Option<String> {
    let mut words = text.split_whitespace();
    let command = words.next()?.strip_prefix('/')?;
    let (name, addressee) = match command.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (command, None),
    };
    if !name.eq_ignore_ascii_case(trigger_word) {
        return None;
    }
    if let (Some(addressee), Some(me)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(me) {
            return None;
        }
    }
    Some(words.collect::<Vec<_>>().join(" ").trim().to_string())
}

/// What to do with one `getUpdates` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Not a trigger command (or not a message at all).
    Skip,
    /// Sender is not white-listed; answer directly without asking the bot.
    Deny { chat_id: String, message_id: String, text: String },
    /// An utterance for the bot.
    Deliver(IncomingMessage),
}

/// Classify a Telegram update.
pub fn classify_update(
    update: &Value,
    channel_id: &str,
    access: &TelegramAccess,
    bot_username: Option<&str>,
) -> UpdateAction {
    let Some(msg) = update.get("message") else {
        debug!("skipping non-message Telegram update");
        return UpdateAction::Skip;
    };
    let Some(text) = msg["text"].as_str() else {
        return UpdateAction::Skip;
    };
    let Some(utterance) = parse_command(text, &access.trigger_word, bot_username) else {
        return UpdateAction::Skip;
    };

    let user_id = msg["from"]["id"].as_i64().unwrap_or_default();
    let chat_id = msg["chat"]["id"].to_string();
    let message_id = msg["message_id"].to_string();

    if !access.is_allowed(user_id) {
        warn!(user_id, "Telegram user not in white list");
        return UpdateAction::Deny {
            chat_id,
            message_id,
            text: access_denied(user_id),
        };
    }

    UpdateAction::Deliver(IncomingMessage {
        id: message_id,
        channel: channel_id.to_string(),
        sender: user_id.to_string(),
        sender_name: msg["from"]["first_name"].as_str().map(String::from),
        target: chat_id,
        text: utterance,
        metadata: Value::Null,
    })
}

/// Telegram channel adapter using Bot API long polling.
pub struct TelegramChannel {
    id: String,
    token: String,
    access: TelegramAccess,
    client: reqwest::Client,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<tokio::sync::watch::Sender<bool>>,
}

impl TelegramChannel {
    pub fn new(id: String, token: String) -> Self {
        // The long poll waits up to 30s server-side, so the request timeout
        // must be larger.
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(45))
            .pool_idle_timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            id,
            token,
            access: TelegramAccess::default(),
            client,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
        }
    }

    pub fn with_access(mut self, access: TelegramAccess) -> Self {
        self.access = access;
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.token)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> &str {
        "telegram"
    }

    async fn start(&mut self) -> talos_core::Result<mpsc::Receiver<ChannelEvent>> {
        if self.token.is_empty() {
            return Err(talos_core::TalosError::Channel {
                channel: "telegram".into(),
                reason: "no bot token configured".into(),
            });
        }

        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let base_url = format!("{TELEGRAM_API_BASE}/bot{}", self.token);
        let bot_username = fetch_bot_username(&self.client, &base_url).await;
        if let Some(ref name) = bot_username {
            info!(bot = %name, trigger = %self.access.trigger_word, "Telegram bot authenticated");
        }

        let client = self.client.clone();
        let connected = Arc::clone(&self.connected);
        let access = self.access.clone();
        let channel_id = self.id.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;
            connected.store(true, Ordering::SeqCst);
            let _ = event_tx.send(ChannelEvent::Connected).await;
            info!("Telegram channel connected, starting long-poll");

            let mut shutdown_rx = shutdown_rx;

            // Grows on consecutive failures, resets on success.
            let mut consecutive_failures: u32 = 0;
            let mut consecutive_conflicts: u32 = 0;
            const MAX_BACKOFF_SECS: u64 = 60;
            const MAX_CONFLICT_RETRIES: u32 = 5;

            let reason = loop {
                if *shutdown_rx.borrow() {
                    info!("Telegram poll loop: shutdown requested");
                    break None;
                }
                if event_tx.is_closed() {
                    info!("Telegram poll loop: event receiver dropped, stopping");
                    break None;
                }

                let request = client
                    .get(format!("{base_url}/getUpdates"))
                    .query(&[("offset", offset), ("timeout", 30)]);

                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        info!("Telegram poll loop: shutdown signal received");
                        break None;
                    }

                    result = request.send() => {
                        let resp = match result {
                            Ok(resp) => resp,
                            Err(e) if e.is_timeout() => {
                                debug!("Telegram long-poll timed out (no updates)");
                                continue;
                            }
                            Err(e) => {
                                warn!(error = %e, "Telegram poll network error");
                                consecutive_failures += 1;
                                tokio::time::sleep(backoff_duration(consecutive_failures, MAX_BACKOFF_SECS)).await;
                                continue;
                            }
                        };

                        let status = resp.status();
                        let data: Value = match resp.json().await {
                            Ok(data) => data,
                            Err(e) => {
                                warn!(status = %status, error = %e, "Telegram poll: failed to parse JSON response");
                                consecutive_failures += 1;
                                tokio::time::sleep(backoff_duration(consecutive_failures, MAX_BACKOFF_SECS)).await;
                                continue;
                            }
                        };

                        if data["ok"].as_bool() != Some(true) {
                            let desc = data["description"].as_str().unwrap_or("unknown error");
                            let code = data["error_code"].as_i64().unwrap_or(status.as_u16() as i64);

                            // Another process is polling with the same token.
                            if code == 409 {
                                consecutive_conflicts += 1;
                                error!(
                                    attempt = consecutive_conflicts,
                                    max = MAX_CONFLICT_RETRIES,
                                    description = %desc,
                                    "Telegram 409 Conflict: another bot instance is polling with the same token"
                                );
                                if consecutive_conflicts >= MAX_CONFLICT_RETRIES {
                                    error!("Stopping Telegram polling: another instance owns this bot token");
                                    break Some("getUpdates conflict".to_string());
                                }
                                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                                continue;
                            }

                            warn!(error_code = code, description = %desc, "Telegram API error response");
                            consecutive_failures += 1;
                            consecutive_conflicts = 0;

                            if code == 429 {
                                let retry_after = data["parameters"]["retry_after"].as_u64().unwrap_or(5);
                                warn!(retry_after, "Telegram rate limited, backing off");
                                tokio::time::sleep(std::time::Duration::from_secs(retry_after)).await;
                            } else if code == 401 {
                                error!("Telegram rejected the bot token");
                                break Some("unauthorized".to_string());
                            } else {
                                tokio::time::sleep(backoff_duration(consecutive_failures, MAX_BACKOFF_SECS)).await;
                            }
                            continue;
                        }

                        if consecutive_failures > 0 || consecutive_conflicts > 0 {
                            info!(
                                prev_failures = consecutive_failures,
                                prev_conflicts = consecutive_conflicts,
                                "Telegram poll recovered"
                            );
                        }
                        consecutive_failures = 0;
                        consecutive_conflicts = 0;

                        let Some(updates) = data["result"].as_array() else {
                            continue;
                        };
                        for update in updates {
                            if let Some(uid) = update["update_id"].as_i64() {
                                offset = uid + 1;
                            }
                            match classify_update(update, &channel_id, &access, bot_username.as_deref()) {
                                UpdateAction::Skip => {}
                                UpdateAction::Deny { chat_id, message_id, text } => {
                                    if let Err(e) = send_message(&client, &base_url, &chat_id, &text, Some(message_id.as_str())).await {
                                        warn!(error = %e, "failed to send access denied reply");
                                    }
                                }
                                UpdateAction::Deliver(incoming) => {
                                    debug!(sender = %incoming.sender, chat = %incoming.target, "Telegram command received");
                                    if event_tx.send(ChannelEvent::Message(incoming)).await.is_err() {
                                        info!("Telegram poll loop: event receiver dropped during dispatch");
                                        connected.store(false, Ordering::SeqCst);
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
            };

            connected.store(false, Ordering::SeqCst);
            let _ = event_tx.send(ChannelEvent::Disconnected(reason)).await;
            info!("Telegram channel disconnected");
        });

        Ok(event_rx)
    }

    async fn send(&self, message: OutgoingMessage) -> talos_core::Result<()> {
        debug!(text_len = message.text.len(), target = %message.target, "Telegram send");
        let base_url = format!("{TELEGRAM_API_BASE}/bot{}", self.token);
        send_message(
            &self.client,
            &base_url,
            &message.target,
            &message.text,
            message.reply_to.as_deref(),
        )
        .await
    }

    async fn send_typing(&self, target: &str) -> talos_core::Result<()> {
        let body = json!({
            "chat_id": target,
            "action": "typing",
        });
        let _ = self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&body)
            .send()
            .await;
        Ok(())
    }

    async fn stop(&mut self) -> talos_core::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Request body for `sendMessage`, replying to `reply_to` when given.
pub fn send_message_body(chat_id: &str, text: &str, reply_to: Option<&str>) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
    });
    if let Some(message_id) = reply_to.and_then(|id| id.parse::<i64>().ok()) {
        body["reply_parameters"] = json!({
            "message_id": message_id,
            "allow_sending_without_reply": true,
        });
    }
    body
}

async fn send_message(
    client: &reqwest::Client,
    base_url: &str,
    chat_id: &str,
    text: &str,
    reply_to: Option<&str>,
) -> talos_core::Result<()> {
    let resp = client
        .post(format!("{base_url}/sendMessage"))
        .json(&send_message_body(chat_id, text, reply_to))
        .send()
        .await
        .map_err(|e| talos_core::TalosError::Channel {
            channel: "telegram".into(),
            reason: e.to_string(),
        })?;

    if !resp.status().is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(talos_core::TalosError::Channel {
            channel: "telegram".into(),
            reason: format!("sendMessage failed: {text}"),
        });
    }
    Ok(())
}

/// The bot's own username via getMe.
async fn fetch_bot_username(client: &reqwest::Client, base_url: &str) -> Option<String> {
    let resp = client.get(format!("{base_url}/getMe")).send().await.ok()?;
    let data: Value = resp.json().await.ok()?;
    data["result"]["username"].as_str().map(String::from)
}

/// Exponential backoff with jitter: 1s, 2s, 4s, 8s, … capped at `max_secs`.
fn backoff_duration(consecutive_failures: u32, max_secs: u64) -> std::time::Duration {
    let base = 1u64
        .checked_shl(consecutive_failures.min(6))
        .unwrap_or(max_secs);
    let capped = base.min(max_secs);
    // ±25% jitter
    let jitter_ms = (rand::random::<u64>() % (capped * 500 + 1)) as i64 - (capped as i64 * 250);
    let ms = (capped as i64 * 1000 + jitter_ms).max(500) as u64;
    std::time::Duration::from_millis(ms)
}
