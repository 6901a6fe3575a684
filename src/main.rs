// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use semantic_embed_service::{
    api::{ApiConfig, ApiServer},
    config::ServiceConfig,
    embeddings::{
        Embedder, EmbeddingModelConfig, ModelInfo, OnnxEmbeddingModel, EMBEDDING_DIMENSION,
        MAX_SEQUENCE_LENGTH, MODEL_NAME,
    },
    models::{embedding_model_files, DownloadConfig, ModelDownloader, EMBEDDING_MODEL_REPO},
};
use std::{env, path::PathBuf, sync::Arc, time::Instant};
use tokio::signal;

/// Embedding service command line
#[derive(Parser, Debug)]
#[command(name = "semantic-embed-service")]
#[command(version = semantic_embed_service::version::VERSION_NUMBER)]
#[command(about = "HTTP embedding service backed by all-MiniLM-L6-v2", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8001")]
    listen_addr: String,

    /// Directory holding model files
    #[arg(long, env = "MODELS_DIR", default_value = "./models")]
    models_dir: PathBuf,

    /// Fetch missing model files from the hub at startup
    #[arg(long, env = "AUTO_DOWNLOAD", default_value_t = true, action = clap::ArgAction::Set)]
    auto_download: bool,

    /// Threads ONNX Runtime uses inside one inference
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    intra_threads: usize,

    /// L2-normalize output vectors
    #[arg(long, env = "NORMALIZE", default_value_t = true, action = clap::ArgAction::Set)]
    normalize: bool,

    /// Include internal error text in 500 responses
    #[arg(long, env = "ERROR_DETAILS")]
    error_details: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ServiceConfig {
        listen_addr: cli.listen_addr,
        models_dir: cli.models_dir,
        auto_download: cli.auto_download,
        intra_threads: cli.intra_threads,
        normalize: cli.normalize,
        error_details: cli.error_details,
    };

    println!("🚀 Starting Semantic Embed Service...\n");
    println!(
        "📦 BUILD VERSION: {}",
        semantic_embed_service::version::VERSION
    );
    println!(
        "📅 Build Date: {}",
        semantic_embed_service::version::BUILD_DATE
    );
    println!();

    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Fetch model files when they are missing
    if config.auto_download {
        println!(
            "📥 Checking model files in {}...",
            config.models_dir.display()
        );

        let mut download_config = DownloadConfig {
            models_dir: config.models_dir.clone(),
            ..Default::default()
        };
        if let Ok(base) = env::var("HUB_BASE_URL") {
            download_config.hub_base_url = base;
        }

        let downloader = ModelDownloader::new(download_config)?;
        match downloader
            .ensure_model(MODEL_NAME, EMBEDDING_MODEL_REPO, &embedding_model_files())
            .await
        {
            Ok(dir) => println!("✅ Model files ready in {}", dir.display()),
            Err(e) => {
                eprintln!("❌ Failed to fetch model files: {}", e);
                eprintln!(
                    "   Check network access, or place model.onnx and tokenizer.json under"
                );
                eprintln!("   {} and retry.", config.model_dir().display());
                std::process::exit(1);
            }
        }
    } else if !config.model_path().exists() || !config.tokenizer_path().exists() {
        eprintln!(
            "❌ Model files not found in {}",
            config.model_dir().display()
        );
        eprintln!("   Auto-download is disabled. Place model.onnx and tokenizer.json there,");
        eprintln!("   or restart with AUTO_DOWNLOAD=true.");
        std::process::exit(1);
    }

    // Load the encoder before accepting any traffic
    println!("🧠 Loading {} encoder...", MODEL_NAME);
    let model_config = EmbeddingModelConfig {
        model_name: MODEL_NAME.to_string(),
        model_path: config.model_path(),
        tokenizer_path: config.tokenizer_path(),
        dimension: EMBEDDING_DIMENSION,
        max_sequence_length: MAX_SEQUENCE_LENGTH,
        intra_threads: config.intra_threads,
        normalize: config.normalize,
    };

    let load_started = Instant::now();
    let encoder = match OnnxEmbeddingModel::load(model_config).await {
        Ok(model) => model,
        Err(e) => {
            eprintln!("❌ Failed to load encoder: {:#}", e);
            std::process::exit(1);
        }
    };
    let load_time_ms = load_started.elapsed().as_millis() as u64;

    let model_info = ModelInfo {
        name: encoder.model_name().to_string(),
        dimension: encoder.dimension(),
        max_sequence_length: encoder.max_length(),
        device: encoder.device().to_string(),
        load_time_ms,
    };
    println!(
        "✅ Encoder loaded in {}ms ({}D, device: {})",
        load_time_ms, model_info.dimension, model_info.device
    );

    // Configure and start API server
    println!("\n🌐 Starting API server...");
    let api_config = ApiConfig {
        listen_addr: config.listen_addr.clone(),
        enable_error_details: config.error_details,
    };

    let server = ApiServer::new(api_config, Arc::new(encoder), model_info).await?;
    let addr = server.local_addr();

    // Print service information
    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("🎉 Semantic Embed Service is running!");
    println!("{}", separator);
    println!("Model:          {}", server.model().name);
    println!("Dimension:      {}", server.model().dimension);
    println!("Device:         {}", server.model().device);
    println!("Listen address: {}", addr);
    println!("\nAPI Endpoints:");
    println!("  Embed:        POST http://{}/embed", addr);
    println!("  Health:       http://{}/health", addr);
    println!("  Info:         http://{}/info", addr);
    println!("  Metrics:      http://{}/metrics", addr);
    println!("\nTest with curl:");
    println!("  curl -X POST http://{}/embed \\", addr);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"texts\": [\"hello world\"]}}'");
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    // Wait for shutdown signal
    signal::ctrl_c().await?;

    println!("\n⏹️  Shutting down...");
    server.shutdown().await;

    println!("👋 Goodbye!");
    Ok(())
}
