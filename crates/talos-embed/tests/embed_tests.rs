#[cfg(test)]
mod tests {
    use talos_embed::{EmbeddingProvider, MockEmbedding, cosine_similarity};

    #[tokio::test]
    async fn test_mock_returns_fixed_vectors_in_order() {
        let provider = MockEmbedding::new(2)
            .with_vector("a", vec![1.0, 0.0])
            .with_vector("b", vec![0.0, 1.0]);
        let vectors = provider.embed(&["b", "a"]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(provider.embedded_count(), 2);
    }

    #[tokio::test]
    async fn test_bag_of_words_prefers_shared_words() {
        let provider = MockEmbedding::new(64);
        let vectors = provider
            .embed(&[
                "execute the job build in the project foo",
                "execute the job deploy in the project bar",
                "what is the weather like",
            ])
            .await
            .unwrap();
        let close = cosine_similarity(&vectors[0], &vectors[1]);
        let far = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(close > far);
    }

    #[tokio::test]
    async fn test_bag_of_words_is_case_insensitive() {
        let provider = MockEmbedding::new(16);
        let vectors = provider.embed(&["Deploy Now", "deploy now"]).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let provider = MockEmbedding::new(4).failing("model offline");
        let err = provider.embed(&["x"]).await.unwrap_err();
        assert!(err.to_string().contains("model offline"));
        assert_eq!(provider.embedded_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let provider = MockEmbedding::new(4);
        assert!(provider.embed(&[]).await.unwrap().is_empty());
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.dimensions(), 4);
    }
}
