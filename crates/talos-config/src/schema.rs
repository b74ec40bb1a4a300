use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use talos_core::ExtractionPatterns;

/// Root configuration: maps to `talos.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TalosConfig {
    pub bot: BotConfig,
    pub matcher: MatcherConfig,
    pub parser: ParserConfig,
    pub channels: ChannelsConfig,
    pub skills: Vec<SkillConfig>,
    pub logging: LoggingConfig,
}

// ── Bot ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Channel to run on when `talos run` gets no `--channel`.
    pub channel: ChannelKind,
    /// Reply used when no skill matches. `None` keeps the built-in reply.
    pub default_reply: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::Cli,
            default_reply: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Cli,
    Telegram,
    Slack,
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cli" => Ok(ChannelKind::Cli),
            "telegram" => Ok(ChannelKind::Telegram),
            "slack" => Ok(ChannelKind::Slack),
            other => Err(format!(
                "unknown channel '{other}' (expected cli, telegram or slack)"
            )),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChannelKind::Cli => "cli",
            ChannelKind::Telegram => "telegram",
            ChannelKind::Slack => "slack",
        };
        f.write_str(name)
    }
}

// ── Matcher ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// "regex" or "embedding".
    pub kind: MatcherKind,
    /// Minimum cosine similarity for the embedding matcher to accept a sentence.
    pub acceptance_threshold: f32,
    pub embedding: EmbeddingConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            kind: MatcherKind::Regex,
            acceptance_threshold: 0.8,
            embedding: EmbeddingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Regex,
    Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai".
    pub provider: String,
    /// Sentence-embedding model name.
    pub model: String,
    /// Override the provider base URL.
    pub base_url: Option<String>,
    /// API key (OpenAI). Falls back to OPENAI_API_KEY.
    pub api_key: Option<String>,
    /// Output dimensions. 0 = provider default.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "nomic-embed-text".into(),
            base_url: None,
            api_key: None,
            dimensions: 0,
        }
    }
}

// ── Parser ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// "regex" or "ner".
    pub kind: ParserKind,
    /// Directory of a model produced by `talos trainer` (NER parser only).
    pub model_path: PathBuf,
    /// Fail extraction when a requested parameter can't be found.
    pub all_required: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            kind: ParserKind::Regex,
            model_path: PathBuf::from("./ner_model"),
            all_required: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    Regex,
    Ner,
}

// ── Channels ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub telegram: TelegramConfig,
    pub slack: SlackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Falls back to TELEGRAM_TOKEN.
    pub token: Option<String>,
    /// Command that triggers the bot, without the leading slash.
    pub trigger_word: String,
    /// Only answer users listed in `white_list`.
    pub restricted: bool,
    /// Telegram user ids allowed when `restricted` is set.
    pub white_list: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            trigger_word: "talos".into(),
            restricted: false,
            white_list: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// App-level token (`xapp-...`) for Socket Mode. Falls back to SLACK_APP_TOKEN.
    pub app_token: Option<String>,
    /// Bot token (`xoxb-...`). Falls back to SLACK_BOT_TOKEN.
    pub bot_token: Option<String>,
    /// Slash command, e.g. "/talos". A missing leading slash is added.
    pub trigger_word: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            app_token: None,
            bot_token: None,
            trigger_word: "/talos".into(),
        }
    }
}

// ── Skills ─────────────────────────────────────────────────────

/// A skill declared in the config file. Its reply is a template where
/// `{NAME}` is replaced with the extracted parameter `NAME`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    pub sentence: String,
    pub reply: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Named regular expressions for the regex parser.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patterns: BTreeMap<String, String>,
    /// Entity labels for the NER parser.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
}

impl SkillConfig {
    pub fn extraction_patterns(&self) -> ExtractionPatterns {
        if !self.patterns.is_empty() {
            ExtractionPatterns::expressions(self.patterns.clone())
        } else if !self.entities.is_empty() {
            ExtractionPatterns::entities(self.entities.clone())
        } else {
            ExtractionPatterns::None
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
    /// Log file path (None = stderr only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            file: None,
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl TalosConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Threshold ───
        let threshold = self.matcher.acceptance_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            warnings.push(ConfigWarning {
                field: "matcher.acceptance_threshold".into(),
                message: format!("threshold {threshold} is out of range"),
                severity: WarningSeverity::Error,
                hint: Some("Cosine similarity lies between -1.0 and 1.0; 0.6 - 0.8 works well".into()),
            });
        } else if self.matcher.kind == MatcherKind::Embedding && threshold < 0.3 {
            warnings.push(ConfigWarning {
                field: "matcher.acceptance_threshold".into(),
                message: format!("threshold {threshold} accepts almost any sentence"),
                severity: WarningSeverity::Warning,
                hint: Some("Unrelated sentences rarely score under 0.3".into()),
            });
        }

        // ── Embedding provider ───
        if self.matcher.kind == MatcherKind::Embedding {
            let valid_providers = ["ollama", "openai"];
            if !valid_providers.contains(&self.matcher.embedding.provider.as_str()) {
                warnings.push(ConfigWarning {
                    field: "matcher.embedding.provider".into(),
                    message: format!("unknown provider '{}'", self.matcher.embedding.provider),
                    severity: WarningSeverity::Error,
                    hint: Some(format!("Valid values: {}", valid_providers.join(", "))),
                });
            } else if self.matcher.embedding.provider == "openai"
                && self.matcher.embedding.api_key.is_none()
            {
                warnings.push(ConfigWarning {
                    field: "matcher.embedding.api_key".into(),
                    message: "openai embeddings need an API key".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Set api_key or export OPENAI_API_KEY".into()),
                });
            }
            if self.matcher.embedding.model.is_empty() {
                warnings.push(ConfigWarning {
                    field: "matcher.embedding.model".into(),
                    message: "model is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Set to e.g. 'nomic-embed-text' or 'text-embedding-3-small'".into()),
                });
            }
        }

        // ── Channel credentials ───
        match self.bot.channel {
            ChannelKind::Telegram if self.channels.telegram.token.is_none() => {
                warnings.push(ConfigWarning {
                    field: "channels.telegram.token".into(),
                    message: "telegram channel selected without a bot token".into(),
                    severity: WarningSeverity::Warning,
                    hint: Some("Set token or export TELEGRAM_TOKEN".into()),
                });
            }
            ChannelKind::Slack
                if self.channels.slack.app_token.is_none()
                    || self.channels.slack.bot_token.is_none() =>
            {
                warnings.push(ConfigWarning {
                    field: "channels.slack".into(),
                    message: "slack channel selected without app_token and bot_token".into(),
                    severity: WarningSeverity::Warning,
                    hint: Some("Export SLACK_APP_TOKEN and SLACK_BOT_TOKEN".into()),
                });
            }
            _ => {}
        }

        if self.channels.telegram.restricted && self.channels.telegram.white_list.is_empty() {
            warnings.push(ConfigWarning {
                field: "channels.telegram.white_list".into(),
                message: "restricted mode with an empty white list denies every user".into(),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        // ── Skills ───
        for (i, skill) in self.skills.iter().enumerate() {
            if skill.sentence.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("skills[{i}].sentence"),
                    message: "sentence is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
            if !skill.patterns.is_empty() && !skill.entities.is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("skills[{i}]"),
                    message: "both `patterns` and `entities` are set".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Use `patterns` with the regex parser, `entities` with the ner parser".into()),
                });
            } else if self.parser.kind == ParserKind::Regex && !skill.entities.is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("skills[{i}].entities"),
                    message: "entities are ignored by the regex parser".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Use `patterns` or set parser.kind = \"ner\"".into()),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for skill in &self.skills {
            if !seen.insert(skill.sentence.as_str()) {
                warnings.push(ConfigWarning {
                    field: "skills".into(),
                    message: format!("sentence '{}' is declared twice, the last one wins", skill.sentence),
                    severity: WarningSeverity::Warning,
                    hint: None,
                });
            }
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
