//! # talos-matchers
//!
//! A matcher picks which registered sentence an utterance is asking for.
//!
//! - [`RegexMatcher`]: each sentence is a regular expression; the first one
//!   matching at the start of the utterance wins.
//! - [`EmbeddingMatcher`]: sentences and utterance are embedded and compared
//!   by cosine similarity; the best score wins if it clears the acceptance
//!   threshold and is not tied.

pub mod embedding;
pub mod matcher;
pub mod regex_matcher;

pub use embedding::{DEFAULT_ACCEPTANCE_THRESHOLD, EmbeddingMatcher, ScoredSentence};
pub use matcher::Matcher;
pub use regex_matcher::RegexMatcher;
