use async_trait::async_trait;
use talos_core::Result;

/// Strategy selecting the registered sentence an utterance refers to.
#[async_trait]
pub trait Matcher: Send + Sync {
    /// Matcher name, for logs.
    fn name(&self) -> &str;

    /// Called when a skill is registered. A matcher rejects sentences it
    /// can never match (e.g. an invalid regular expression).
    fn prepare(&self, _sentence: &str) -> Result<()> {
        Ok(())
    }

    /// Called when a skill is removed. Drops anything cached for `sentence`.
    fn forget(&self, _sentence: &str) {}

    /// Return the candidate `input` refers to.
    ///
    /// Fails with `NoMatchingSkill` when nothing fits and `AmbiguousScore`
    /// when the matcher cannot tell two candidates apart.
    async fn sentence_matcher(&self, input: &str, candidates: &[&str]) -> Result<String>;
}
