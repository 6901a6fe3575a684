// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod handlers;
pub mod server;

pub use embed::{embed_handler, EmbedRequest, EmbedResponse};
pub use errors::{error_response, ApiError, ErrorResponse};
pub use handlers::{HealthResponse, InfoResponse};
pub use server::{create_router, ApiConfig, ApiServer, AppState};
