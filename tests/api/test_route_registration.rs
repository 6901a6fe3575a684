// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route Registration tests
//!
//! These tests verify that:
//! - The /embed route is properly registered
//! - The route accepts POST requests and rejects other methods
//! - The operational routes respond to GET
//! - Unknown paths return 404
//! - CORS headers are present on responses

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use semantic_embed_service::api::{create_router, AppState};
use tower::util::ServiceExt; // for `oneshot`

fn test_app() -> Router {
    create_router(AppState::new_for_test())
}

#[cfg(test)]
mod route_registration_tests {
    use super::*;

    /// Test 1: Embed route is registered for POST
    #[tokio::test]
    async fn test_embed_route_registered() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/embed")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"texts": ["test"]}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Route should be registered and return 200 OK"
        );
    }

    /// Test 2: GET on /embed is rejected with 405
    #[tokio::test]
    async fn test_embed_route_rejects_get() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/embed")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    /// Test 3: Operational routes respond to GET
    #[tokio::test]
    async fn test_operational_routes_registered() {
        for uri in ["/health", "/info", "/metrics"] {
            let request = Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap();

            let response = test_app().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "GET {} should be 200", uri);
        }
    }

    /// Test 4: Unknown paths return 404
    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/v1/embed")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// Test 5: CORS headers are present for cross-origin callers
    #[tokio::test]
    async fn test_cors_headers_present() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/embed")
            .header("content-type", "application/json")
            .header("origin", "http://localhost:3000")
            .body(Body::from(r#"{"texts": ["test"]}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin"),
            "Permissive CORS should echo an allow-origin header"
        );
    }
}
