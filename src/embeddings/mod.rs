//! Text embedding engines
//!
//! The HTTP layer talks to an [`Embedder`] trait object so the real ONNX
//! model and the deterministic hash encoder used in tests are
//! interchangeable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

pub mod onnx_model;

pub use onnx_model::OnnxEmbeddingModel;

/// Name of the sentence transformer this service ships
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Output dimensionality of the served model
pub const EMBEDDING_DIMENSION: usize = 384;

/// Token budget per input text; longer inputs are truncated
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// A sentence encoder: texts in, fixed-dimensional vectors out
///
/// Implementations must be deterministic within one process and must
/// return exactly one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("Encoder returned no vector for a single input"))
    }

    /// Dimensionality of every vector this encoder produces
    fn dimension(&self) -> usize;

    /// Human-readable model identifier
    fn model_name(&self) -> &str;

    /// Execution device label ("cpu" or "cuda")
    fn device(&self) -> &str {
        "cpu"
    }
}

/// Configuration for loading the ONNX embedding model
#[derive(Debug, Clone)]
pub struct EmbeddingModelConfig {
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub dimension: usize,
    pub max_sequence_length: usize,
    pub intra_threads: usize,
    pub normalize: bool,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            model_name: MODEL_NAME.to_string(),
            model_path: PathBuf::from("./models/all-MiniLM-L6-v2/model.onnx"),
            tokenizer_path: PathBuf::from("./models/all-MiniLM-L6-v2/tokenizer.json"),
            dimension: EMBEDDING_DIMENSION,
            max_sequence_length: MAX_SEQUENCE_LENGTH,
            intra_threads: 4,
            normalize: true,
        }
    }
}

/// Descriptor for a loaded encoder, surfaced on the info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub dimension: usize,
    pub max_sequence_length: usize,
    pub device: String,
    pub load_time_ms: u64,
}

/// Deterministic hash-based encoder
///
/// Seeds a linear congruential generator from the text's hash, so equal
/// texts map to equal vectors and distinct texts (almost always) differ.
/// Carries no model files, which keeps API tests hermetic. Not wired into
/// the binary.
pub struct HashEmbedder {
    dimension: usize,
    normalize: bool,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            normalize: true,
        }
    }

    pub fn with_normalize(dimension: usize, normalize: bool) -> Self {
        Self {
            dimension,
            normalize,
        }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);

        let mut current_seed = seed;
        for i in 0..self.dimension {
            // Linear congruential step, perturbed by the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);

            // Map into [-1, 1]
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.normalize {
            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for value in &mut embedding {
                    *value /= norm;
                }
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.generate(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}
