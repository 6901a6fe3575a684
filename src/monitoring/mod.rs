// src/monitoring/mod.rs - Main monitoring module

pub mod metrics;

// Re-export main types
pub use metrics::ApiMetrics;
