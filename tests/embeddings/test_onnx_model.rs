// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Model tests for embedding generation
//!
//! The loading-failure tests always run. The inference tests need the
//! model files under ./models/all-MiniLM-L6-v2 (a first service start
//! downloads them) and are marked ignored; run with `cargo test -- --ignored`.

use semantic_embed_service::embeddings::{Embedder, EmbeddingModelConfig, OnnxEmbeddingModel};

#[cfg(test)]
mod onnx_model_tests {
    use super::*;

    /// Test 1: Loading from a missing model path fails with the path in the error
    #[tokio::test]
    async fn test_load_missing_model_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingModelConfig {
            model_path: dir.path().join("model.onnx"),
            tokenizer_path: dir.path().join("tokenizer.json"),
            ..Default::default()
        };

        let result = OnnxEmbeddingModel::load(config).await;

        assert!(result.is_err());
        let message = format!("{:#}", result.err().unwrap());
        assert!(
            message.contains("model.onnx"),
            "Error should name the missing file: {}",
            message
        );
    }

    /// Test 2: A present model file with a missing tokenizer still fails cleanly
    #[tokio::test]
    async fn test_load_missing_tokenizer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        std::fs::write(&model_path, b"placeholder").unwrap();

        let config = EmbeddingModelConfig {
            model_path,
            tokenizer_path: dir.path().join("tokenizer.json"),
            ..Default::default()
        };

        let result = OnnxEmbeddingModel::load(config).await;

        assert!(result.is_err());
        let message = format!("{:#}", result.err().unwrap());
        assert!(
            message.contains("tokenizer.json"),
            "Error should name the missing file: {}",
            message
        );
    }

    /// Test 3: Model loads successfully from disk
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_model_loads_successfully() {
        let result = OnnxEmbeddingModel::load(EmbeddingModelConfig::default()).await;

        assert!(
            result.is_ok(),
            "Failed to load ONNX model: {:?}",
            result.err()
        );

        let model = result.unwrap();
        assert_eq!(model.model_name(), "all-MiniLM-L6-v2");
        assert_eq!(model.dimension(), 384);
        assert_eq!(model.max_length(), 256);
    }

    /// Test 4: Single text produces a normalized 384-dimensional vector
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_single_embedding_is_normalized() {
        let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default())
            .await
            .expect("Failed to load model");

        let vector = model.embed("The quick brown fox").await.unwrap();

        assert_eq!(vector.len(), 384);
        for (i, &val) in vector.iter().enumerate() {
            assert!(val.is_finite(), "Embedding[{}] is not finite: {}", i, val);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 1e-3,
            "Vector should be unit length, got norm {}",
            norm
        );
    }

    /// Test 5: Batch output count and order match the input
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_batch_preserves_count_and_order() {
        let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default())
            .await
            .expect("Failed to load model");

        let texts = vec![
            "A cat sits on the mat".to_string(),
            "Stock markets closed higher today".to_string(),
            "The recipe calls for two eggs".to_string(),
        ];

        let batch = model.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);

        // Each slot must match its text embedded alone. Padding differs
        // between the two runs, so allow a small numeric tolerance.
        for (i, text) in texts.iter().enumerate() {
            let single = model.embed(text).await.unwrap();
            for (a, b) in batch[i].iter().zip(single.iter()) {
                assert!(
                    (a - b).abs() < 1e-4,
                    "Batch slot {} should match its text embedded alone",
                    i
                );
            }
        }
    }

    /// Test 6: Equal texts produce equal vectors within a process
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_embedding_is_deterministic() {
        let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default())
            .await
            .expect("Failed to load model");

        let first = model.embed("determinism check").await.unwrap();
        let second = model.embed("determinism check").await.unwrap();

        assert_eq!(first, second);
    }

    /// Test 7: Texts beyond the sequence limit are truncated, not rejected
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_long_text_is_truncated() {
        let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default())
            .await
            .expect("Failed to load model");

        let long_text = "embedding ".repeat(2000);
        let vector = model.embed(&long_text).await.unwrap();

        assert_eq!(vector.len(), 384);
    }

    /// Test 8: Empty strings embed to a valid vector
    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_empty_string_embeds() {
        let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default())
            .await
            .expect("Failed to load model");

        let vector = model.embed("").await.unwrap();

        assert_eq!(vector.len(), 384);
        assert!(vector.iter().all(|v| v.is_finite()));
    }
}
