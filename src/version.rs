// Version information for the Semantic Embed Service

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-onnx-embeddings-2025-08-22";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 0;

/// Minor version number
pub const VERSION_MINOR: u32 = 1;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-08-22";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "batch-embedding",
    "onnx-runtime",
    "mean-pooling",
    "l2-normalization",
    "model-auto-download",
    "prometheus-metrics",
    "graceful-shutdown",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Semantic Embed Service {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "model": crate::embeddings::MODEL_NAME,
        "dimension": crate::embeddings::EMBEDDING_DIMENSION,
    })
}
