// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod downloading;

// Re-export downloading types
pub use downloading::{
    embedding_model_files, DownloadConfig, DownloadError, ModelDownloader, ModelFile, RetryPolicy,
    DEFAULT_HUB_BASE_URL, EMBEDDING_MODEL_REPO,
};
