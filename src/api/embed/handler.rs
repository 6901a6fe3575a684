// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler
//!
//! The whole pipeline is: parse the batch, hand it to the encoder, wrap
//! the vectors. Parse failures become 400s before the encoder runs;
//! encoder failures become 500s. Nothing is retried and nothing is kept
//! per request beyond the log line.

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::errors::{error_response, ApiError};
use crate::api::server::AppState;
use crate::embeddings::Embedder;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// POST /embed handler
///
/// # Request Body
/// ```json
/// {"texts": ["text1", "text2"]}
/// ```
///
/// # Response Body
/// ```json
/// {"vectors": [[0.1, 0.2, ...], [0.3, 0.4, ...]]}
/// ```
///
/// Vectors come back in input order, one per text, all with the model's
/// dimensionality. An empty batch yields `{"vectors": []}`.
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    state.metrics.embed_requests_total.inc();

    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(
                "Rejected embed request {}: {}",
                request_id,
                rejection.body_text()
            );
            return error_response(ApiError::InvalidRequest(rejection.body_text()), &request_id);
        }
    };

    debug!("Embed request {}: {} texts", request_id, request.texts.len());
    let started = Instant::now();

    match state.encoder.embed_batch(&request.texts).await {
        Ok(vectors) => {
            let elapsed = started.elapsed();
            state
                .metrics
                .embed_texts_total
                .inc_by(request.texts.len() as u64);
            state
                .metrics
                .embed_duration_seconds
                .observe(elapsed.as_secs_f64());
            info!(
                "✅ Embed request {}: {} texts in {:.1}ms",
                request_id,
                request.texts.len(),
                elapsed.as_secs_f64() * 1000.0
            );
            Json(EmbedResponse { vectors }).into_response()
        }
        Err(e) => {
            state.metrics.embed_failures_total.inc();
            error!("❌ Embed request {} failed: {:#}", request_id, e);
            let message = if state.error_details {
                format!("Embedding failed: {}", e)
            } else {
                "Embedding failed".to_string()
            };
            error_response(ApiError::InternalError(message), &request_id)
        }
    }
}
