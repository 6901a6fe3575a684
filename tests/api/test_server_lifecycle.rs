// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Server lifecycle tests
//!
//! These tests bind a real listener on an ephemeral port and talk to the
//! server over HTTP. They verify that:
//! - The server binds, reports its actual address, and serves requests
//! - Graceful shutdown stops the listener

use semantic_embed_service::{
    api::{ApiConfig, ApiServer},
    embeddings::{Embedder, HashEmbedder, ModelInfo},
};
use std::sync::Arc;
use std::time::Duration;

fn test_model_info(encoder: &dyn Embedder) -> ModelInfo {
    ModelInfo {
        name: encoder.model_name().to_string(),
        dimension: encoder.dimension(),
        max_sequence_length: 256,
        device: encoder.device().to_string(),
        load_time_ms: 0,
    }
}

async fn start_test_server() -> ApiServer {
    let config = ApiConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        enable_error_details: false,
    };
    let encoder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(384));
    let model = test_model_info(encoder.as_ref());

    ApiServer::new(config, encoder, model)
        .await
        .expect("Server should bind an ephemeral port")
}

/// Test 1: The server binds and serves embed requests over HTTP
#[tokio::test]
async fn test_server_serves_embed_requests() {
    let server = start_test_server().await;
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0, "Bound port should be resolved");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/embed", addr))
        .json(&serde_json::json!({ "texts": ["hello", "world"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let vectors = body["vectors"].as_array().unwrap();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].as_array().unwrap().len(), 384);

    server.shutdown().await;
}

/// Test 2: Health endpoint is reachable over the wire
#[tokio::test]
async fn test_server_serves_health() {
    let server = start_test_server().await;
    let addr = server.local_addr();

    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    server.shutdown().await;
}

/// Test 3: Shutdown stops the listener
#[tokio::test]
async fn test_shutdown_stops_listener() {
    let server = start_test_server().await;
    let addr = server.local_addr();

    // Server answers before shutdown
    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    server.shutdown().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A fresh connection should now be refused
    let result = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap()
        .get(format!("http://{}/health", addr))
        .send()
        .await;

    assert!(result.is_err(), "Listener should be closed after shutdown");
}
