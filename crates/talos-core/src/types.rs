use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters extracted from an utterance, keyed by name.
pub type Params = BTreeMap<String, String>;

/// How a skill wants its parameters extracted from the utterance.
///
/// The regex parser consumes `Expressions` (name → regular expression with a
/// capture group); the NER parser consumes `Entities` (entity labels).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPatterns {
    #[default]
    None,
    Expressions(Vec<(String, String)>),
    Entities(Vec<String>),
}

impl ExtractionPatterns {
    /// Build named expressions from `(name, regex)` pairs.
    pub fn expressions<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ExtractionPatterns::Expressions(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build entity labels.
    pub fn entities<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExtractionPatterns::Entities(labels.into_iter().map(Into::into).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ExtractionPatterns::None)
    }

    /// Parameter names requested by these patterns, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            ExtractionPatterns::None => vec![],
            ExtractionPatterns::Expressions(exprs) => {
                exprs.iter().map(|(name, _)| name.as_str()).collect()
            }
            ExtractionPatterns::Entities(labels) => labels.iter().map(|l| l.as_str()).collect(),
        }
    }
}
