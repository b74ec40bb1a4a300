//! # talos-channels
//!
//! Channel adapters bridge a messaging surface to the bot. Each adapter
//! implements [`Channel`]: it emits the utterances it receives as
//! [`ChannelEvent`]s and sends the bot's replies back.
//!
//! | Channel  | Transport                     | Trigger                 |
//! |----------|-------------------------------|-------------------------|
//! | CLI      | stdin / stdout                | every line              |
//! | Telegram | Bot API long polling          | `/talos <utterance>`    |
//! | Slack    | Socket Mode slash commands    | `/talos <utterance>`    |

pub mod adapter;
pub mod cli;
pub mod slack;
pub mod telegram;

pub use adapter::{Channel, ChannelEvent, IncomingMessage, OutgoingMessage};
pub use cli::CliChannel;
pub use slack::SlackChannel;
pub use telegram::{TelegramAccess, TelegramChannel};
