use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message exchanged between a channel and the bot.
///
/// `meta` carries channel-specific data (chat id, response url, sender...)
/// from the incoming message to the reply so the channel can route it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Create a message without metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
            meta: Default::default(),
        }
    }

    /// Create a message with channel metadata.
    pub fn with_meta(
        text: impl Into<String>,
        meta: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            meta,
            ..Self::new(text)
        }
    }

    /// Build the reply to this message, keeping its metadata.
    pub fn reply(&self, text: impl Into<String>) -> Self {
        Self::with_meta(text, self.meta.clone())
    }

    /// Read a string value from the metadata.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}
