//! # talos-cli
//!
//! Command-line interface for the Talos chatops bot.
//!
//! ## Commands
//!
//! - `talos run` : Start the bot on a channel (cli, telegram, slack)
//! - `talos ask` : Answer one sentence and exit
//! - `talos trainer` : Train the NER parser's model
//! - `talos skills` : List configured skills
//! - `talos config` : Show the effective configuration
//! - `talos init` : Write a starter talos.toml

pub mod commands;
pub mod logging;

pub use commands::Cli;
