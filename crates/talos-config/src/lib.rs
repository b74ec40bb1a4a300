//! # talos-config
//!
//! Configuration system for Talos. Reads from `talos.toml` and environment
//! variables, in that precedence order; CLI flags are applied on top by the
//! `talos` binary.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::TalosConfig;
pub use schema::{
    BotConfig, ChannelKind, ChannelsConfig, ConfigWarning, EmbeddingConfig, LoggingConfig,
    MatcherConfig, MatcherKind, ParserConfig, ParserKind, SkillConfig, SlackConfig,
    TelegramConfig, WarningSeverity,
};
