use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use talos_config::{ChannelKind, ConfigLoader, TalosConfig};
use talos_core::TalosError;

mod init;
mod run;
mod skills;
mod trainer;

pub use init::STARTER_CONFIG;

/// Talos, a chatops bot that turns sentences into skills
#[derive(Parser, Debug)]
#[command(name = "talos", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to talos.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot on a channel
    Run {
        /// Channel to serve: cli, telegram or slack (default: [bot] channel)
        #[arg(long)]
        channel: Option<ChannelKind>,
    },
    /// Answer a single sentence and exit
    Ask {
        /// The sentence to answer
        #[arg(required = true, num_args = 1..)]
        sentence: Vec<String>,
    },
    /// Train a named-entity model for the NER parser
    Trainer {
        /// JSON training set
        #[arg(long)]
        trainingset: PathBuf,
        /// Directory the trained model is written to
        #[arg(long)]
        output: PathBuf,
        /// Existing model directory to keep training
        #[arg(long)]
        model: Option<PathBuf>,
        /// Maximum number of passes over the training set
        #[arg(long, default_value_t = talos_parsers::DEFAULT_ITERATIONS)]
        iterations: usize,
    },
    /// List the skills declared in the config
    Skills,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a starter talos.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub async fn run(self) -> talos_core::Result<()> {
        // `init` writes the file the other commands read, so it must not
        // require a loadable config.
        if let Commands::Init { force } = self.command {
            let path = self
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from("talos.toml"));
            return init::cmd_init(&path, force);
        }
        if let Commands::Completions { shell } = self.command {
            return Self::cmd_completions(shell);
        }

        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let log_level = crate::logging::resolve_level(
            self.verbose,
            self.quiet,
            self.log_level.as_deref(),
            &config.logging.level,
        );
        crate::logging::init(&config.logging, log_level)?;

        match self.command {
            Commands::Run { channel } => {
                run::cmd_run(&config, channel.unwrap_or(config.bot.channel)).await
            }
            Commands::Ask { sentence } => run::cmd_ask(&config, &sentence.join(" ")).await,
            Commands::Trainer {
                trainingset,
                output,
                model,
                iterations,
            } => trainer::cmd_trainer(&trainingset, &output, model.as_deref(), iterations),
            Commands::Skills => skills::cmd_skills(&config),
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Init { .. } | Commands::Completions { .. } => Ok(()),
        }
    }

    fn cmd_config(config: &TalosConfig, json: bool) -> talos_core::Result<()> {
        let config = redact_secrets(config.clone());
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| TalosError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> talos_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "talos", &mut std::io::stdout());
        Ok(())
    }
}

const REDACTED: &str = "********";

/// Mask tokens and API keys before a config is printed.
fn redact_secrets(mut config: TalosConfig) -> TalosConfig {
    for secret in [
        &mut config.channels.telegram.token,
        &mut config.channels.slack.app_token,
        &mut config.channels.slack.bot_token,
        &mut config.matcher.embedding.api_key,
    ] {
        if secret.is_some() {
            *secret = Some(REDACTED.to_string());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_channel() {
        let cli = parse(&["talos", "run", "--channel", "telegram"]);
        assert!(matches!(
            cli.command,
            Commands::Run {
                channel: Some(ChannelKind::Telegram)
            }
        ));

        let cli = parse(&["talos", "--config", "bot.toml", "run"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("bot.toml")));
        assert!(matches!(cli.command, Commands::Run { channel: None }));

        assert!(Cli::try_parse_from(["talos", "run", "--channel", "irc"]).is_err());
    }

    #[test]
    fn parses_trainer() {
        let cli = parse(&[
            "talos",
            "trainer",
            "--trainingset",
            "set.json",
            "--output",
            "model",
        ]);
        match cli.command {
            Commands::Trainer {
                trainingset,
                output,
                model,
                iterations,
            } => {
                assert_eq!(trainingset, PathBuf::from("set.json"));
                assert_eq!(output, PathBuf::from("model"));
                assert!(model.is_none());
                assert_eq!(iterations, talos_parsers::DEFAULT_ITERATIONS);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["talos", "trainer", "--output", "model"]).is_err());
    }

    #[test]
    fn ask_joins_words() {
        let cli = parse(&["talos", "ask", "deploy", "web", "to", "prod"]);
        match cli.command {
            Commands::Ask { sentence } => assert_eq!(sentence.join(" "), "deploy web to prod"),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["talos", "ask"]).is_err());
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["talos", "-v", "-q", "skills"]).is_err());
        let cli = parse(&["talos", "skills", "--log-level", "warn"]);
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn secrets_are_redacted() {
        let mut config = TalosConfig::default();
        config.channels.telegram.token = Some("123:abc".into());
        config.channels.slack.bot_token = Some("xoxb-1".into());

        let redacted = redact_secrets(config);
        assert_eq!(redacted.channels.telegram.token.as_deref(), Some(REDACTED));
        assert_eq!(redacted.channels.slack.bot_token.as_deref(), Some(REDACTED));
        assert!(redacted.channels.slack.app_token.is_none());
        assert!(redacted.matcher.embedding.api_key.is_none());
    }
}
