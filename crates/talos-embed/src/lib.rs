//! # talos-embed
//!
//! Sentence embeddings for the semantic matcher. Providers turn sentences into
//! vectors; the matcher compares them with [`cosine_similarity`].

pub mod mock;
pub mod provider;
pub mod similarity;

pub use mock::MockEmbedding;
pub use provider::{EmbeddingProvider, OllamaEmbedding, OpenAiEmbedding, provider_from_config};
pub use similarity::cosine_similarity;
