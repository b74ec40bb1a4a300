//! # talos-runtime
//!
//! The bot pipeline.
//!
//! ```text
//!   Channel ──utterance──▶ Matcher ──sentence──▶ Parser ──params──▶ Skill
//!      ▲                                                              │
//!      └──────────────────────────── reply ◀─────────────────────────┘
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use talos_core::{ExtractionPatterns, Params};
//! use talos_matchers::RegexMatcher;
//! use talos_parsers::RegexParser;
//! use talos_runtime::Bot;
//!
//! # async fn demo() -> talos_core::Result<()> {
//! let mut bot = Bot::new(Arc::new(RegexMatcher::new()), Arc::new(RegexParser::new()));
//! bot.register(
//!     "Execute the job ([a-zA-Z0-9_]+) in the project ([a-zA-Z/]+)",
//!     ExtractionPatterns::expressions([
//!         ("PROJECT", ".*project ([a-zA-Z/]+).*"),
//!         ("JOB", ".*job ([a-zA-Z0-9_]+).*"),
//!     ]),
//!     |p: &Params| format!("Checking pipeline {} for project {}...", p["JOB"], p["PROJECT"]),
//! )?;
//! bot.run(Box::new(talos_channels::CliChannel::new())).await
//! # }
//! ```

pub mod bot;
pub mod builder;

pub use bot::Bot;
pub use builder::{channel_from_config, matcher_from_config, parser_from_config};
