// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! This module provides a wrapper around ONNX Runtime for running
//! the all-MiniLM-L6-v2 sentence transformer model.
//!
//! Features:
//! - ONNX model loading from disk
//! - Optional GPU acceleration via CUDA (with automatic CPU fallback)
//! - BERT tokenization with truncation and batch padding
//! - Batch embedding generation
//! - Attention-mask-weighted mean pooling over token embeddings
//! - L2 normalization of pooled vectors
//! - 384-dimensional output vectors

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::CPUExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;
#[cfg(feature = "cuda")]
use tracing::warn;

use super::{Embedder, EmbeddingModelConfig};

/// ONNX-based embedding model (all-MiniLM-L6-v2)
///
/// Wraps an ONNX Runtime session behind the [`Embedder`] trait. The model
/// outputs token-level embeddings; sentence vectors come from mean pooling
/// weighted by the attention mask, followed by L2 normalization (the same
/// pipeline the upstream sentence transformer applies).
///
/// # Thread Safety
/// The session requires exclusive access per `run` call, so it sits behind
/// a `Mutex`; everything else is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    /// ONNX Runtime session (Mutex because `run` takes `&mut self`)
    session: Arc<Mutex<Session>>,

    /// BERT tokenizer, configured to truncate at `max_length`
    tokenizer: Arc<Tokenizer>,

    /// Model name (e.g., "all-MiniLM-L6-v2")
    model_name: String,

    /// Output dimension (384 for all-MiniLM-L6-v2)
    dimension: usize,

    /// Maximum sequence length (256 for all-MiniLM-L6-v2)
    max_length: usize,

    /// Whether pooled vectors are L2-normalized
    normalize: bool,

    /// Execution provider the session ended up on
    device: &'static str,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .field("normalize", &self.normalize)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer from disk
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - A probe inference does not produce `[batch, seq_len, dimension]`
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::load(EmbeddingModelConfig::default()).await?;
    /// ```
    pub async fn load(config: EmbeddingModelConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();
        let tokenizer_path = config.tokenizer_path.as_path();

        // Validate paths exist
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!("🚀 Initializing ONNX embedding model");
        let (mut session, device) = build_session(model_path, config.intra_threads)?;
        info!("✅ ONNX embedding model loaded successfully ({})", device);

        // Load tokenizer
        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;

        // Validate output dimensionality by running a probe inference.
        // Wrap in a block to ensure outputs are dropped before moving session.
        {
            let probe_encoding = tokenizer
                .encode("validation test", true)
                .map_err(|e| anyhow::anyhow!("Tokenizer validation failed: {}", e))?;

            let input_ids: Vec<i64> = probe_encoding
                .get_ids()
                .iter()
                .map(|&id| id as i64)
                .collect();
            let attention_mask: Vec<i64> = probe_encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let token_type_ids: Vec<i64> = vec![0i64; input_ids.len()];

            let input_ids_array = Array2::from_shape_vec((1, input_ids.len()), input_ids)
                .context("Failed to create input_ids array")?;
            let attention_mask_array =
                Array2::from_shape_vec((1, attention_mask.len()), attention_mask)
                    .context("Failed to create attention_mask array")?;
            let token_type_ids_array =
                Array2::from_shape_vec((1, token_type_ids.len()), token_type_ids)
                    .context("Failed to create token_type_ids array")?;

            let outputs = session.run(ort::inputs![
                "input_ids" => Value::from_array(input_ids_array)?,
                "attention_mask" => Value::from_array(attention_mask_array)?,
                "token_type_ids" => Value::from_array(token_type_ids_array)?
            ])?;

            // Index [0] instead of a name since different exports name the
            // output differently
            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;
            let output_shape = output_tensor.shape();

            // Token-level embeddings: [batch, seq_len, hidden_dim]
            if output_shape.len() != 3 || output_shape[2] != config.dimension {
                anyhow::bail!(
                    "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, {}])",
                    output_shape,
                    config.dimension
                );
            }
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name: config.model_name,
            dimension: config.dimension,
            max_length: config.max_sequence_length,
            normalize: config.normalize,
            device,
        })
    }

    /// Maximum sequence length inputs are truncated to
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

#[async_trait]
impl Embedder for OnnxEmbeddingModel {
    /// Generates embeddings for a batch of texts
    ///
    /// Tokenizes all texts, pads them to the longest sequence in the batch,
    /// runs a single inference, then mean-pools and normalizes per text.
    /// An empty batch short-circuits without touching the session.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Tokenize all texts
        let encodings: Vec<_> = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        // Find max length in batch for padding
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        // Prepare batch tensors (pad all sequences to same length)
        let mut input_ids_batch = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask_batch = Vec::with_capacity(texts.len() * max_len);
        let mut token_type_ids_batch = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            input_ids_batch.extend(ids.iter().map(|&id| id as i64));
            attention_mask_batch.extend(mask.iter().map(|&m| m as i64));
            token_type_ids_batch.extend(std::iter::repeat(0i64).take(ids.len()));

            // Pad to max_len
            let padding_needed = max_len - ids.len();
            input_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            attention_mask_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            token_type_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        // Keep a copy of the mask for mean pooling
        let attention_mask_for_pooling = attention_mask_batch.clone();

        let input_ids_array = Array2::from_shape_vec((texts.len(), max_len), input_ids_batch)
            .context("Failed to create batch input_ids array")?;
        let attention_mask_array =
            Array2::from_shape_vec((texts.len(), max_len), attention_mask_batch)
                .context("Failed to create batch attention_mask array")?;
        let token_type_ids_array =
            Array2::from_shape_vec((texts.len(), max_len), token_type_ids_batch)
                .context("Failed to create batch token_type_ids array")?;

        // Lock the session for the duration of the run call
        let mut session_guard = self.session.lock().unwrap();
        let outputs = session_guard.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Token-level embeddings [batch, seq_len, hidden_dim] -> one pooled
        // vector per batch item
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for batch_idx in 0..texts.len() {
            let batch_item = output_array.index_axis(Axis(0), batch_idx); // [seq_len, hidden_dim]
            let seq_len = batch_item.shape()[0];
            let hidden_dim = batch_item.shape()[1];

            let mask_start = batch_idx * max_len;
            let mask_end = mask_start + max_len;
            let item_mask = &attention_mask_for_pooling[mask_start..mask_end];

            // Mean pooling weighted by attention mask, ignoring padding
            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;

            for i in 0..seq_len {
                let mask_value = item_mask[i] as f32;
                sum_mask += mask_value;
                for j in 0..hidden_dim {
                    pooled[j] += batch_item[[i, j]] * mask_value;
                }
            }

            for val in &mut pooled {
                *val /= sum_mask.max(1e-9); // Avoid division by zero
            }

            if self.normalize {
                l2_normalize(&mut pooled);
            }

            embeddings.push(pooled);
        }

        // Validate all embeddings are the expected dimension
        for (i, emb) in embeddings.iter().enumerate() {
            if emb.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    emb.len(),
                    self.dimension
                );
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn device(&self) -> &str {
        self.device
    }
}

/// Builds the ONNX Runtime session, preferring CUDA when the feature is
/// enabled and falling back to CPU
fn build_session(model_path: &Path, intra_threads: usize) -> Result<(Session, &'static str)> {
    #[cfg(feature = "cuda")]
    {
        info!("   Attempting CUDA execution provider...");
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => {
                info!("✅ CUDA execution provider initialized successfully!");
                return Ok((session, "cuda"));
            }
            Err(e) => {
                warn!("⚠️  CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
            }
        }
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load ONNX model from {}",
            model_path.display()
        ))?;

    Ok((session, "cpu"))
}

/// Scales a vector to unit length, leaving all-zero vectors untouched
fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
