// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::embeddings::ModelInfo;

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub dimension: usize,
}

/// Body of `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub model: ModelInfo,
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub cpu_count: usize,
    pub memory_rss_mb: f64,
}
