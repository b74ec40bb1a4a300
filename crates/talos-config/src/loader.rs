use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::{ChannelKind, TalosConfig};

/// Loads and reloads the Talos configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<TalosConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > TALOS_CONFIG env > ./talos.toml > ~/.talos/talos.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("TALOS_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("talos.toml");
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".talos")
            .join("talos.toml")
    }

    /// Load the config from disk, falling back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing file at
    /// one of the default locations is not.
    pub fn load(path: Option<&Path>) -> talos_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::read(&config_path)?
        } else if path.is_some() {
            return Err(talos_core::TalosError::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        } else {
            warn!(?config_path, "config file not found, using defaults");
            TalosConfig::default()
        };

        Self::from_config(Self::apply_env_overrides(config), config_path)
    }

    /// Wrap an already-built config (tests, embedding Talos as a library).
    pub fn from_config(config: TalosConfig, config_path: PathBuf) -> talos_core::Result<Self> {
        // Validate config: log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(talos_core::TalosError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    fn read(config_path: &Path) -> talos_core::Result<TalosConfig> {
        let raw = std::fs::read_to_string(config_path)?;
        toml::from_str::<TalosConfig>(&raw).map_err(|e| {
            talos_core::TalosError::Config(format!(
                "failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> TalosConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<TalosConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was (or would have been) loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (TALOS_LOG_LEVEL, TELEGRAM_TOKEN, etc.)
    pub fn apply_env_overrides(mut config: TalosConfig) -> TalosConfig {
        if let Ok(v) = std::env::var("TALOS_LOG_LEVEL") {
            config.logging.level = v.to_lowercase();
        }
        if let Ok(v) = std::env::var("TALOS_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TALOS_CHANNEL") {
            match v.parse::<ChannelKind>() {
                Ok(kind) => config.bot.channel = kind,
                Err(e) => warn!(error = %e, "ignoring TALOS_CHANNEL"),
            }
        }
        if let Ok(v) = std::env::var("MODEL_PATH") {
            config.parser.model_path = PathBuf::from(v);
        }
        // Secrets: the config file takes priority, env is the fallback.
        if config.channels.telegram.token.is_none() {
            if let Ok(v) = std::env::var("TELEGRAM_TOKEN") {
                config.channels.telegram.token = Some(v);
            }
        }
        if config.channels.slack.app_token.is_none() {
            if let Ok(v) = std::env::var("SLACK_APP_TOKEN") {
                config.channels.slack.app_token = Some(v);
            }
        }
        if config.channels.slack.bot_token.is_none() {
            if let Ok(v) = std::env::var("SLACK_BOT_TOKEN") {
                config.channels.slack.bot_token = Some(v);
            }
        }
        if config.matcher.embedding.api_key.is_none() {
            if let Ok(v) = std::env::var("OPENAI_API_KEY") {
                config.matcher.embedding.api_key = Some(v);
            }
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> talos_core::Result<()> {
        if !self.config_path.exists() {
            return Err(talos_core::TalosError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::read(&self.config_path)?);
        new_config
            .validate()
            .map_err(talos_core::TalosError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
