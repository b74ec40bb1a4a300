use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use talos_core::{ExtractionPatterns, Params, Result, TalosError};
use tracing::debug;

use crate::parser::Parser;

/// Parser using one regular expression per parameter.
///
/// Expressions are searched anywhere in the sentence. The value is the first
/// capture group, or the whole match for an expression without groups.
#[derive(Default)]
pub struct RegexParser {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl RegexParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn regex(&self, expression: &str) -> Result<Regex> {
        if let Some(re) = self.compiled.read().get(expression) {
            return Ok(re.clone());
        }
        let re = Regex::new(expression).map_err(|e| TalosError::InvalidPattern {
            pattern: expression.to_string(),
            reason: e.to_string(),
        })?;
        self.compiled
            .write()
            .insert(expression.to_string(), re.clone());
        Ok(re)
    }

    fn expressions(patterns: &ExtractionPatterns) -> Result<&[(String, String)]> {
        match patterns {
            ExtractionPatterns::None => Ok(&[]),
            ExtractionPatterns::Expressions(exprs) => Ok(exprs.as_slice()),
            ExtractionPatterns::Entities(_) => Err(TalosError::UnsupportedPatterns(
                "the regex parser needs named expressions, got entity labels".into(),
            )),
        }
    }
}

impl Parser for RegexParser {
    fn name(&self) -> &str {
        "regex"
    }

    fn validate(&self, patterns: &ExtractionPatterns) -> Result<()> {
        for (_, expression) in Self::expressions(patterns)? {
            self.regex(expression)?;
        }
        Ok(())
    }

    fn extract_parameters(
        &self,
        sentence: &str,
        patterns: &ExtractionPatterns,
        all_required: bool,
    ) -> Result<Params> {
        let mut parameters = Params::new();
        for (name, expression) in Self::expressions(patterns)? {
            let re = self.regex(expression)?;
            // Group 0 only stands in when the expression has no group at all;
            // an optional group that did not participate is a missing value.
            let group = if re.captures_len() == 1 { 0 } else { 1 };
            let value = re
                .captures(sentence)
                .and_then(|caps| caps.get(group))
                .map(|m| m.as_str().to_string());
            match value {
                Some(value) => {
                    debug!(parameter = %name, value = %value, "extracted parameter");
                    parameters.insert(name.clone(), value);
                }
                None if all_required => {
                    return Err(TalosError::MissingParameters(format!(
                        "Missing required parameter: {name}"
                    )));
                }
                None => {}
            }
        }
        Ok(parameters)
    }
}
