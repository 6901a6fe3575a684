// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Hash encoder tests
//!
//! The hash encoder backs the hermetic API tests, so its contract matters:
//! deterministic vectors of the requested dimension, equal for equal texts,
//! distinct for distinct texts, and usable through the Embedder trait object.

use semantic_embed_service::embeddings::{Embedder, HashEmbedder};
use std::sync::Arc;

#[cfg(test)]
mod hash_embedder_tests {
    use super::*;

    /// Test 1: Vectors carry the requested dimension
    #[tokio::test]
    async fn test_dimension_matches_request() {
        let encoder = HashEmbedder::new(384);

        let vector = encoder.embed("dimension check").await.unwrap();

        assert_eq!(vector.len(), 384);
        assert_eq!(encoder.dimension(), 384);
    }

    /// Test 2: Equal texts map to equal vectors across instances
    #[tokio::test]
    async fn test_deterministic_across_instances() {
        let first = HashEmbedder::new(384).embed("stable text").await.unwrap();
        let second = HashEmbedder::new(384).embed("stable text").await.unwrap();

        assert_eq!(first, second);
    }

    /// Test 3: Distinct texts map to distinct vectors
    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let encoder = HashEmbedder::new(384);

        let a = encoder.embed("first").await.unwrap();
        let b = encoder.embed("second").await.unwrap();

        assert_ne!(a, b);
    }

    /// Test 4: Batch output aligns with input order
    #[tokio::test]
    async fn test_batch_aligns_with_singles() {
        let encoder = HashEmbedder::new(384);
        let texts = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ];

        let batch = encoder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);

        for (i, text) in texts.iter().enumerate() {
            let single = encoder.embed(text).await.unwrap();
            assert_eq!(batch[i], single, "Batch slot {} should match its text", i);
        }
    }

    /// Test 5: Empty batch yields an empty result
    #[tokio::test]
    async fn test_empty_batch() {
        let encoder = HashEmbedder::new(384);

        let vectors = encoder.embed_batch(&[]).await.unwrap();

        assert!(vectors.is_empty());
    }

    /// Test 6: Default output is L2-normalized, opt-out is not
    #[tokio::test]
    async fn test_normalization_toggle() {
        let normalized = HashEmbedder::new(384).embed("norm check").await.unwrap();
        let norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "Norm should be 1.0, got {}", norm);

        let raw = HashEmbedder::with_normalize(384, false)
            .embed("norm check")
            .await
            .unwrap();
        let raw_norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((raw_norm - 1.0).abs() > 1e-3, "Raw vector should not be unit length");
    }

    /// Test 7: Works behind the trait object the server holds
    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let encoder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(128));

        let vectors = encoder
            .embed_batch(&["through the trait".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 128);
        assert_eq!(encoder.model_name(), "hash-embedder");
        assert_eq!(encoder.device(), "cpu");
    }
}
