// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the embedding service

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::embeddings::MODEL_NAME;

/// Configuration for the embedding service process
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Directory model artifacts are stored under
    pub models_dir: PathBuf,
    /// Whether missing model files are fetched from the hub at startup
    pub auto_download: bool,
    /// ONNX Runtime intra-op thread count
    pub intra_threads: usize,
    /// Whether pooled embeddings are L2-normalized
    pub normalize: bool,
    /// Whether internal error messages are exposed in API responses
    pub error_details: bool,
}

impl ServiceConfig {
    /// Directory holding the served model's artifacts
    pub fn model_dir(&self) -> PathBuf {
        self.models_dir.join(MODEL_NAME)
    }

    /// Path to the ONNX graph file
    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join("model.onnx")
    }

    /// Path to the HuggingFace tokenizer file
    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir().join("tokenizer.json")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "Listen address '{}' is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.intra_threads == 0 {
            return Err("Intra-op thread count must be greater than 0".to_string());
        }
        if self.models_dir.as_os_str().is_empty() {
            return Err("Models directory must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8001".to_string(),
            models_dir: PathBuf::from("./models"),
            auto_download: true,
            intra_threads: 4,
            normalize: true,
            error_details: false,
        }
    }
}
