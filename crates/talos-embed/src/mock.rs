//! Mock embedding provider for deterministic testing.
//!
//! Returns pre-configured vectors without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::EmbeddingProvider;
use talos_core::{Result, TalosError};

/// A mock provider that returns fixed vectors per sentence.
///
/// Sentences without a fixed vector get a bag-of-words vector: each
/// lowercase word is hashed into one of `dims` buckets. Sentences sharing
/// words therefore score higher than unrelated ones.
///
/// # Example
/// ```
/// use talos_embed::MockEmbedding;
/// let provider = MockEmbedding::new(3)
///     .with_vector("deploy the app", vec![1.0, 0.0, 0.0]);
/// ```
pub struct MockEmbedding {
    vectors: HashMap<String, Vec<f32>>,
    dims: usize,
    /// Every text passed to `embed`, in call order (for assertions in tests).
    pub requests: Arc<Mutex<Vec<String>>>,
    error: Option<String>,
}

impl MockEmbedding {
    pub fn new(dims: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dims: dims.max(1),
            requests: Arc::new(Mutex::new(vec![])),
            error: None,
        }
    }

    /// Fix the vector returned for `text`.
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Make every call fail with `msg`.
    pub fn failing(mut self, msg: &str) -> Self {
        self.error = Some(msg.to_string());
        self
    }

    /// Number of texts embedded so far.
    pub fn embedded_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn bag_of_words(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            // FNV-1a keeps bucket assignment stable across runs.
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dims as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if let Some(ref msg) = self.error {
            return Err(TalosError::Embedding(msg.clone()));
        }
        self.requests
            .lock()
            .extend(texts.iter().map(|t| t.to_string()));
        Ok(texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(*t)
                    .cloned()
                    .unwrap_or_else(|| self.bag_of_words(t))
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "mock"
    }
}
