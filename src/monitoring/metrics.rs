// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prometheus metrics for the embedding API

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Counters and histograms exported on `GET /metrics`
///
/// Collectors are internally reference-counted, so cloning this struct
/// shares the underlying metrics.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    /// Embed requests received, including rejected ones
    pub embed_requests_total: IntCounter,
    /// Embed requests that failed with a server error
    pub embed_failures_total: IntCounter,
    /// Individual texts embedded across all requests
    pub embed_texts_total: IntCounter,
    /// Wall-clock seconds spent in the encoder per request
    pub embed_duration_seconds: Histogram,
}

impl ApiMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let embed_requests_total =
            IntCounter::new("embed_requests_total", "Total embed requests received")?;
        let embed_failures_total = IntCounter::new(
            "embed_failures_total",
            "Embed requests that failed with a server error",
        )?;
        let embed_texts_total = IntCounter::new(
            "embed_texts_total",
            "Total texts embedded across all requests",
        )?;
        let embed_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "embed_duration_seconds",
            "Time spent encoding a request batch, in seconds",
        ))?;

        registry
            .register(Box::new(embed_requests_total.clone()))
            .context("Failed to register embed_requests_total")?;
        registry
            .register(Box::new(embed_failures_total.clone()))
            .context("Failed to register embed_failures_total")?;
        registry
            .register(Box::new(embed_texts_total.clone()))
            .context("Failed to register embed_texts_total")?;
        registry
            .register(Box::new(embed_duration_seconds.clone()))
            .context("Failed to register embed_duration_seconds")?;

        Ok(Self {
            registry,
            embed_requests_total,
            embed_failures_total,
            embed_texts_total,
            embed_duration_seconds,
        })
    }

    /// Renders all registered metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output was not valid UTF-8")
    }
}
