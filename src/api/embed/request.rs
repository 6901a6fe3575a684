// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed

use serde::{Deserialize, Serialize};

/// Request body for POST /embed
///
/// The batch may be empty (it embeds to an empty vector list) and elements
/// may be empty strings. No batch-size or text-length limits are imposed.
/// Unknown fields are ignored; a missing or non-string-array `texts` is
/// rejected before the encoder runs.
///
/// # Example
/// ```json
/// {"texts": ["Hello world", "Another text"]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Text strings to embed, in the order their vectors come back
    pub texts: Vec<String>,
}
