// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod models;
pub mod monitoring;
pub mod version;

// Re-export main types
pub use api::{create_router, ApiConfig, ApiServer, AppState, EmbedRequest, EmbedResponse};
pub use config::ServiceConfig;
pub use embeddings::{
    Embedder, EmbeddingModelConfig, HashEmbedder, ModelInfo, OnnxEmbeddingModel,
    EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH, MODEL_NAME,
};
pub use models::{DownloadConfig, ModelDownloader};
pub use monitoring::ApiMetrics;
