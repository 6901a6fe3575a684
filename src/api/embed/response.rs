// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use serde::{Deserialize, Serialize};

/// Response body for POST /embed
///
/// `vectors[i]` is the embedding of `texts[i]` from the request; every
/// vector has the model's fixed dimensionality. The body carries nothing
/// else.
///
/// # Example
/// ```json
/// {"vectors": [[0.1, 0.2, ...], [0.3, 0.4, ...]]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// One embedding per input text, in input order
    pub vectors: Vec<Vec<f32>>,
}
