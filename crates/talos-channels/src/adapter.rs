use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use talos_core::Message;
use tokio::sync::mpsc;

/// An incoming utterance from a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Channel-specific message ID.
    pub id: String,
    /// Channel identifier (e.g., "telegram", "slack").
    pub channel: String,
    /// Sender identifier (channel-specific).
    pub sender: String,
    /// Display name of the sender.
    pub sender_name: Option<String>,
    /// Where the reply goes (chat id, Slack channel id, ...).
    pub target: String,
    /// The utterance, already stripped of any trigger command.
    pub text: String,
    /// Channel-specific routing data the reply needs (e.g. Slack's `response_url`).
    #[serde(default)]
    pub metadata: Value,
}

/// A reply to send via a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target channel.
    pub channel: String,
    /// Target chat/user/group ID.
    pub target: String,
    /// Text content.
    pub text: String,
    /// Reply to a specific message ID.
    pub reply_to: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// Events emitted by a channel adapter.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A new utterance arrived.
    Message(IncomingMessage),
    /// The channel connected successfully.
    Connected,
    /// The channel disconnected.
    Disconnected(Option<String>),
}

const META_CHANNEL: &str = "channel";
const META_TARGET: &str = "target";
const META_MESSAGE_ID: &str = "message_id";
const META_SENDER: &str = "sender";
const META_METADATA: &str = "metadata";

impl IncomingMessage {
    /// The utterance as a bot [`Message`], with the routing data in `meta`.
    pub fn to_message(&self) -> Message {
        let mut meta = Map::new();
        meta.insert(META_CHANNEL.into(), Value::String(self.channel.clone()));
        meta.insert(META_TARGET.into(), Value::String(self.target.clone()));
        meta.insert(META_MESSAGE_ID.into(), Value::String(self.id.clone()));
        meta.insert(META_SENDER.into(), Value::String(self.sender.clone()));
        if !self.metadata.is_null() {
            meta.insert(META_METADATA.into(), self.metadata.clone());
        }
        Message::with_meta(self.text.clone(), meta)
    }
}

impl OutgoingMessage {
    /// Route a bot reply back using the `meta` it inherited from the
    /// incoming message. `None` if the reply carries no target.
    pub fn from_reply(reply: &Message) -> Option<Self> {
        Some(Self {
            channel: reply.meta_str(META_CHANNEL)?.to_string(),
            target: reply.meta_str(META_TARGET)?.to_string(),
            text: reply.text.clone(),
            reply_to: reply.meta_str(META_MESSAGE_ID).map(str::to_string),
            metadata: reply.meta.get(META_METADATA).cloned().unwrap_or(Value::Null),
        })
    }
}

/// Trait implemented by each channel adapter.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique identifier for this channel instance.
    fn id(&self) -> &str;

    /// Channel type name (e.g., "cli", "telegram", "slack").
    fn channel_type(&self) -> &str;

    /// Start the channel adapter. Returns a receiver for incoming events.
    async fn start(&mut self) -> talos_core::Result<mpsc::Receiver<ChannelEvent>>;

    /// Send a message through this channel.
    async fn send(&self, message: OutgoingMessage) -> talos_core::Result<()>;

    /// Send a typing indicator. Most channels have none.
    async fn send_typing(&self, _target: &str) -> talos_core::Result<()> {
        Ok(())
    }

    /// Stop the channel adapter gracefully.
    async fn stop(&mut self) -> talos_core::Result<()>;

    /// Check if the channel is currently connected.
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incoming() -> IncomingMessage {
        IncomingMessage {
            id: "42".into(),
            channel: "telegram".into(),
            sender: "1001".into(),
            sender_name: Some("Ada".into()),
            target: "-100200".into(),
            text: "deploy the app".into(),
            metadata: json!({ "response_url": "https://hooks.example/1" }),
        }
    }

    #[test]
    fn reply_routes_back_to_sender() {
        let msg = incoming().to_message();
        assert_eq!(msg.text, "deploy the app");
        assert_eq!(msg.meta_str("target"), Some("-100200"));

        let out = OutgoingMessage::from_reply(&msg.reply("done")).unwrap();
        assert_eq!(out.channel, "telegram");
        assert_eq!(out.target, "-100200");
        assert_eq!(out.text, "done");
        assert_eq!(out.reply_to.as_deref(), Some("42"));
        assert_eq!(out.metadata["response_url"], "https://hooks.example/1");
    }

    #[test]
    fn reply_without_routing_is_dropped() {
        assert!(OutgoingMessage::from_reply(&Message::new("orphan")).is_none());
    }

    #[test]
    fn null_metadata_is_not_copied() {
        let mut inc = incoming();
        inc.metadata = Value::Null;
        let msg = inc.to_message();
        assert!(!msg.meta.contains_key("metadata"));
        let out = OutgoingMessage::from_reply(&msg).unwrap();
        assert!(out.metadata.is_null());
    }
}
