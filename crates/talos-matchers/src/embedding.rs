use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use talos_core::{Result, TalosError};
use talos_embed::{EmbeddingProvider, cosine_similarity};
use tracing::debug;

use crate::matcher::Matcher;

pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.8;

/// Similarity of one registered sentence to the utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub sentence: String,
    pub score: f32,
    /// `score >= acceptance_threshold`.
    pub passed: bool,
}

/// Matcher comparing sentence embeddings with cosine similarity.
///
/// Embeddings of registered sentences are cached, so once warm only the
/// utterance is sent to the provider.
pub struct EmbeddingMatcher {
    provider: Arc<dyn EmbeddingProvider>,
    acceptance_threshold: f32,
    cache: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingMatcher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_threshold(mut self, acceptance_threshold: f32) -> Self {
        self.acceptance_threshold = acceptance_threshold;
        self
    }

    pub fn acceptance_threshold(&self) -> f32 {
        self.acceptance_threshold
    }

    /// Drop cached sentence embeddings (e.g. after switching models).
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Cosine similarity of `pattern` against each of `sentences`, in order.
    pub async fn get_similarities(&self, sentences: &[&str], pattern: &str) -> Result<Vec<f32>> {
        let missing: Vec<&str> = {
            let cache = self.cache.read();
            let mut seen = HashSet::new();
            sentences
                .iter()
                .copied()
                .filter(|s| !cache.contains_key(*s) && seen.insert(*s))
                .collect()
        };

        let mut batch = Vec::with_capacity(missing.len() + 1);
        batch.push(pattern);
        batch.extend(missing.iter().copied());

        let mut embeddings = self.provider.embed(&batch).await?;
        if embeddings.len() != batch.len() {
            return Err(TalosError::Embedding(format!(
                "{} returned {} embeddings for {} sentences",
                self.provider.name(),
                embeddings.len(),
                batch.len()
            )));
        }

        let fresh = embeddings.split_off(1);
        let pattern_embedding = embeddings.remove(0);

        let mut cache = self.cache.write();
        for (sentence, embedding) in missing.iter().zip(fresh) {
            cache.insert(sentence.to_string(), embedding);
        }

        Ok(sentences
            .iter()
            .map(|s| {
                cache
                    .get(*s)
                    .map(|e| cosine_similarity(&pattern_embedding, e))
                    .unwrap_or(0.0)
            })
            .collect())
    }

    /// Score a single sentence against `pattern`.
    pub async fn match_sentence(&self, sentence: &str, pattern: &str) -> Result<ScoredSentence> {
        let mut results = self.match_sentences(&[sentence], pattern).await?;
        results
            .pop()
            .ok_or_else(|| TalosError::Embedding("no similarity computed".into()))
    }

    /// Score every sentence against `pattern`.
    pub async fn match_sentences(
        &self,
        sentences: &[&str],
        pattern: &str,
    ) -> Result<Vec<ScoredSentence>> {
        let scores = self.get_similarities(sentences, pattern).await?;
        Ok(sentences
            .iter()
            .zip(scores)
            .map(|(sentence, score)| ScoredSentence {
                sentence: sentence.to_string(),
                score,
                passed: score >= self.acceptance_threshold,
            })
            .collect())
    }

    /// Pick the best result: reject below threshold, reject a tie at the top.
    pub fn select(&self, results: &[ScoredSentence]) -> Result<String> {
        if results.is_empty() {
            return Err(TalosError::NoMatchingSkill("Couldn't match any sentence".into()));
        }

        let mut scores: Vec<f32> = results.iter().map(|r| r.score).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        let maximum = scores[scores.len() - 1];

        if maximum < self.acceptance_threshold {
            return Err(TalosError::NoMatchingSkill(format!(
                "The maximum score ({maximum}) doesn't reach the acceptance_threshold ({})",
                self.acceptance_threshold
            )));
        }
        if scores.len() > 1 && scores[scores.len() - 2] == maximum {
            return Err(TalosError::AmbiguousScore(format!(
                "Ambiguous score, two sentences matched the same maximum score of {maximum}"
            )));
        }

        results
            .iter()
            .find(|r| r.score == maximum)
            .map(|r| r.sentence.clone())
            .ok_or_else(|| TalosError::NoMatchingSkill("Couldn't match any sentence".into()))
    }
}

#[async_trait]
impl Matcher for EmbeddingMatcher {
    fn name(&self) -> &str {
        "embedding"
    }

    fn forget(&self, sentence: &str) {
        self.cache.write().remove(sentence);
    }

    async fn sentence_matcher(&self, input: &str, candidates: &[&str]) -> Result<String> {
        if candidates.is_empty() {
            return Err(TalosError::NoMatchingSkill("Couldn't match any sentence".into()));
        }
        let results = self.match_sentences(candidates, input).await?;
        for r in &results {
            debug!(sentence = %r.sentence, score = r.score, passed = r.passed, "similarity");
        }
        self.select(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talos_embed::MockEmbedding;

    fn scored(sentence: &str, score: f32) -> ScoredSentence {
        ScoredSentence {
            sentence: sentence.into(),
            score,
            passed: score >= DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }

    fn matcher() -> EmbeddingMatcher {
        EmbeddingMatcher::new(Arc::new(MockEmbedding::new(8)))
    }

    #[test]
    fn select_picks_maximum() {
        let m = matcher();
        let out = m
            .select(&[scored("a", 0.81), scored("b", 0.95), scored("c", 0.2)])
            .unwrap();
        assert_eq!(out, "b");
    }

    #[test]
    fn select_rejects_below_threshold() {
        let m = matcher();
        let err = m.select(&[scored("a", 0.5), scored("b", 0.79)]).unwrap_err();
        assert!(matches!(err, TalosError::NoMatchingSkill(_)));
        assert!(err.to_string().contains("0.79"));
    }

    #[test]
    fn select_uses_maximum_not_last_score() {
        let m = matcher();
        // The highest score is first; a low trailing score must not reject it.
        assert_eq!(m.select(&[scored("a", 0.9), scored("b", 0.1)]).unwrap(), "a");
    }

    #[test]
    fn select_rejects_tie_at_top() {
        let m = matcher();
        let err = m
            .select(&[scored("a", 0.9), scored("b", 0.9), scored("c", 0.3)])
            .unwrap_err();
        assert!(matches!(err, TalosError::AmbiguousScore(_)));
    }

    #[test]
    fn select_allows_tie_below_top() {
        let m = matcher();
        let out = m
            .select(&[scored("a", 0.4), scored("b", 0.4), scored("c", 0.9)])
            .unwrap();
        assert_eq!(out, "c");
    }

    #[test]
    fn select_empty_is_no_match() {
        let err = matcher().select(&[]).unwrap_err();
        assert!(matches!(err, TalosError::NoMatchingSkill(_)));
    }

    #[test]
    fn single_candidate_at_threshold_passes() {
        let m = matcher().with_threshold(0.5);
        assert_eq!(m.select(&[scored("a", 0.5)]).unwrap(), "a");
    }

    #[tokio::test]
    async fn forget_evicts_cached_embedding() {
        let provider = Arc::new(MockEmbedding::new(8));
        let m = EmbeddingMatcher::new(provider.clone());

        m.get_similarities(&["deploy the app", "show the status"], "deploy")
            .await
            .unwrap();
        assert_eq!(provider.embedded_count(), 3);

        m.forget("show the status");
        assert_eq!(m.cache.read().len(), 1);

        m.get_similarities(&["deploy the app", "show the status"], "deploy")
            .await
            .unwrap();
        assert_eq!(provider.embedded_count(), 5);
    }
}
