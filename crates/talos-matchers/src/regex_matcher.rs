use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use talos_core::{Result, TalosError};
use tracing::{debug, warn};

use crate::matcher::Matcher;

/// Matcher treating each registered sentence as a regular expression.
///
/// A sentence matches when its expression matches at the beginning of the
/// utterance; trailing text is allowed. Candidates are tried in order and
/// the first match wins.
#[derive(Default)]
pub struct RegexMatcher {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl RegexMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(sentence: &str) -> Result<Regex> {
        Regex::new(&format!("^(?:{sentence})")).map_err(|e| TalosError::InvalidPattern {
            pattern: sentence.to_string(),
            reason: e.to_string(),
        })
    }

    fn is_match(&self, sentence: &str, input: &str) -> Result<bool> {
        if let Some(re) = self.compiled.read().get(sentence) {
            return Ok(re.is_match(input));
        }
        let re = Self::compile(sentence)?;
        let matched = re.is_match(input);
        self.compiled.write().insert(sentence.to_string(), re);
        Ok(matched)
    }

    /// Every candidate matching `input`, in candidate order.
    pub fn match_sentences<'a>(&self, candidates: &[&'a str], input: &str) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|sentence| match self.is_match(sentence, input) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(error = %e, "skipping sentence that is not a valid expression");
                    false
                }
            })
            .collect()
    }
}

#[async_trait]
impl Matcher for RegexMatcher {
    fn name(&self) -> &str {
        "regex"
    }

    fn prepare(&self, sentence: &str) -> Result<()> {
        let re = Self::compile(sentence)?;
        self.compiled.write().insert(sentence.to_string(), re);
        Ok(())
    }

    fn forget(&self, sentence: &str) {
        self.compiled.write().remove(sentence);
    }

    async fn sentence_matcher(&self, input: &str, candidates: &[&str]) -> Result<String> {
        let results = self.match_sentences(candidates, input);
        debug!(input, matches = results.len(), "regex matching done");
        results
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| TalosError::NoMatchingSkill("Couldn't match any sentence".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_at_start_only() {
        let m = RegexMatcher::new();
        assert_eq!(m.match_sentences(&["deploy"], "deploy now"), vec!["deploy"]);
        assert!(m.match_sentences(&["deploy"], "please deploy").is_empty());
    }

    #[test]
    fn alternation_is_grouped_by_anchor() {
        let m = RegexMatcher::new();
        // Without the non-capturing group `^a|b` would match "xb".
        assert!(m.match_sentences(&["a|b"], "xb").is_empty());
        assert_eq!(m.match_sentences(&["a|b"], "b"), vec!["a|b"]);
    }

    #[test]
    fn prepare_rejects_invalid_expression() {
        let m = RegexMatcher::new();
        let err = m.prepare("Execute (the job").unwrap_err();
        assert!(matches!(err, TalosError::InvalidPattern { .. }));
        assert!(m.prepare("Execute the job ([a-z]+)").is_ok());
    }

    #[test]
    fn forget_drops_compiled_expression() {
        let m = RegexMatcher::new();
        m.prepare("deploy ([a-z]+)").unwrap();
        m.prepare("status").unwrap();
        assert_eq!(m.compiled.read().len(), 2);

        m.forget("deploy ([a-z]+)");
        assert!(!m.compiled.read().contains_key("deploy ([a-z]+)"));
        assert_eq!(m.compiled.read().len(), 1);
    }

    #[test]
    fn invalid_candidate_is_skipped() {
        let m = RegexMatcher::new();
        assert_eq!(m.match_sentences(&["(", "ok"], "ok"), vec!["ok"]);
    }
}
