use talos_core::{ExtractionPatterns, Params, Result};

/// Strategy extracting named parameters from an utterance.
pub trait Parser: Send + Sync {
    /// Parser name, for logs.
    fn name(&self) -> &str;

    /// Called when a skill is registered; rejects patterns this parser can't use.
    fn validate(&self, _patterns: &ExtractionPatterns) -> Result<()> {
        Ok(())
    }

    /// Extract the parameters `patterns` asks for.
    ///
    /// With `all_required`, a parameter that can't be found fails the whole
    /// extraction with `MissingParameters`; otherwise it is left out.
    fn extract_parameters(
        &self,
        sentence: &str,
        patterns: &ExtractionPatterns,
        all_required: bool,
    ) -> Result<Params>;
}
