use thiserror::Error;

/// Unified error type for the entire Talos framework.
#[derive(Error, Debug)]
pub enum TalosError {
    // ── Matching errors ────────────────────────────────────────
    #[error("no matching skill: {0}")]
    NoMatchingSkill(String),

    #[error("ambiguous score: {0}")]
    AmbiguousScore(String),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // ── Parameter extraction errors ────────────────────────────
    #[error("{0}")]
    MissingParameters(String),

    #[error("unsupported extraction patterns: {0}")]
    UnsupportedPatterns(String),

    // ── Model errors ───────────────────────────────────────────
    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("invalid training set: {0}")]
    TrainingSet(String),

    // ── Skill errors ───────────────────────────────────────────
    #[error("skill failed: {skill}: {reason}")]
    Skill { skill: String, reason: String },

    // ── Channel errors ─────────────────────────────────────────
    #[error("channel error: {channel}: {reason}")]
    Channel { channel: String, reason: String },

    #[error("channel not connected: {0}")]
    ChannelNotConnected(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TalosError {
    /// Whether the error means "fall back to the default skill" rather than a failure.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            TalosError::NoMatchingSkill(_) | TalosError::AmbiguousScore(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TalosError>;
