// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model artifact downloading
//!
//! Fetches the served model's files from the HuggingFace Hub when they are
//! missing on disk, matching what the upstream sentence-transformers loader
//! does implicitly at construction. Transfers stream into a temp file, are
//! optionally checked against a SHA-256 digest, and land atomically.

use anyhow::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};
use url::Url;

/// Repository the served model's artifacts come from
pub const EMBEDDING_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Default hub endpoint
pub const DEFAULT_HUB_BASE_URL: &str = "https://huggingface.co";

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory models are stored under
    pub models_dir: PathBuf,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retry behavior for failed transfers
    pub retry_policy: RetryPolicy,
    /// Hub endpoint; overridable so tests can serve artifacts locally
    pub hub_base_url: String,
    /// Whether a progress bar is drawn during transfers
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
            timeout_secs: 300,
            retry_policy: RetryPolicy::default(),
            hub_base_url: DEFAULT_HUB_BASE_URL.to_string(),
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (zero-based), capped at
    /// `max_delay_ms`
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self.exponential_base.powi(attempt as i32);
        let delay_ms = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// One artifact of a model: where it lives in the repo and what it is
/// called locally
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub filename: String,
    pub remote_path: String,
    pub sha256: Option<String>,
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Checksum mismatch - expected: {expected}, actual: {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Max retries exceeded: {attempts} attempts")]
    MaxRetriesExceeded { attempts: usize },
    #[error("Invalid hub base URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        DownloadError::NetworkError(e.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        DownloadError::IoError(e.to_string())
    }
}

/// Manifest of files the served model needs on disk
///
/// The ONNX export lives under `onnx/` in the upstream repo but is stored
/// flat next to the tokenizer locally.
pub fn embedding_model_files() -> Vec<ModelFile> {
    vec![
        ModelFile {
            filename: "model.onnx".to_string(),
            remote_path: "onnx/model.onnx".to_string(),
            sha256: None,
        },
        ModelFile {
            filename: "tokenizer.json".to_string(),
            remote_path: "tokenizer.json".to_string(),
            sha256: None,
        },
    ]
}

pub struct ModelDownloader {
    config: DownloadConfig,
    client: reqwest::Client,
}

impl ModelDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                if let Ok(value) =
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                {
                    headers.insert(reqwest::header::AUTHORIZATION, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("semantic-embed-service/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    /// Directory a model's artifacts are stored under
    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.config.models_dir.join(model_name)
    }

    /// Downloads any missing or invalid artifacts, returning the model
    /// directory. Present-and-valid files are left untouched, so calling
    /// this on every startup is cheap.
    pub async fn ensure_model(
        &self,
        model_name: &str,
        repo_id: &str,
        files: &[ModelFile],
    ) -> Result<PathBuf> {
        let model_path = self.model_dir(model_name);

        if self.is_model_complete(&model_path, files).await? {
            info!("✅ Model {} already present", model_name);
            return Ok(model_path);
        }

        info!("📥 Downloading model {} from {}", model_name, repo_id);
        fs::create_dir_all(&model_path).await?;

        for file in files {
            if self
                .is_file_valid(&model_path.join(&file.filename), file)
                .await?
            {
                continue;
            }
            self.download_file(repo_id, file, &model_path).await?;
        }

        info!("✅ Model {} downloaded successfully", model_name);
        Ok(model_path)
    }

    /// Checks that every artifact exists, is non-empty, and matches its
    /// digest when one is pinned
    async fn is_model_complete(&self, model_path: &Path, files: &[ModelFile]) -> Result<bool> {
        if !model_path.exists() {
            return Ok(false);
        }

        for file in files {
            if !self
                .is_file_valid(&model_path.join(&file.filename), file)
                .await?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn is_file_valid(&self, file_path: &Path, file: &ModelFile) -> Result<bool> {
        if !file_path.exists() {
            return Ok(false);
        }

        let metadata = fs::metadata(file_path).await?;
        if metadata.len() == 0 {
            warn!("⚠️  File {} is empty, will re-download", file.filename);
            return Ok(false);
        }

        if let Some(expected) = &file.sha256 {
            let actual = sha256_hex(file_path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                warn!(
                    "Checksum mismatch for {}, will re-download",
                    file_path.display()
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Downloads one artifact with retries and exponential backoff
    async fn download_file(&self, repo_id: &str, file: &ModelFile, dest_dir: &Path) -> Result<()> {
        let url = self.resolve_url(repo_id, &file.remote_path)?;
        let dest_path = dest_dir.join(&file.filename);
        let max_retries = self.config.retry_policy.max_retries;

        let mut attempts = 0;
        loop {
            match self.try_download_once(&url, file, &dest_path).await {
                Ok(()) => {
                    info!("✅ {} downloaded from {}", file.filename, url);
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    if attempts > max_retries {
                        warn!(
                            "❌ Giving up on {} after {} attempts: {}",
                            file.filename, attempts, e
                        );
                        return Err(DownloadError::MaxRetriesExceeded { attempts }.into());
                    }
                    let delay = self.config.retry_policy.delay_for(attempts - 1);
                    warn!(
                        "⚠️  Attempt {}/{} failed for {}: {} (retrying in {:?})",
                        attempts,
                        max_retries + 1,
                        file.filename,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Hub URL for an artifact, e.g.
    /// `https://huggingface.co/<repo>/resolve/main/<path>`
    fn resolve_url(&self, repo_id: &str, remote_path: &str) -> Result<String, DownloadError> {
        let base = Url::parse(&self.config.hub_base_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", self.config.hub_base_url, e)))?;
        Ok(format!(
            "{}/{}/resolve/main/{}",
            base.as_str().trim_end_matches('/'),
            repo_id,
            remote_path
        ))
    }

    /// One transfer attempt: stream to a temp file, verify, persist
    async fn try_download_once(
        &self,
        url: &str,
        file: &ModelFile,
        dest_path: &Path,
    ) -> Result<(), DownloadError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let total_size = response.content_length().unwrap_or(0);
        let progress = if self.config.show_progress && total_size > 0 {
            let pb = ProgressBar::new(total_size);
            pb.set_style(
                ProgressStyle::with_template(
                    "   📥 {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            );
            pb.set_message(file.filename.clone());
            pb
        } else {
            ProgressBar::hidden()
        };

        let parent = dest_path.parent().ok_or_else(|| {
            DownloadError::IoError(format!("No parent directory for {}", dest_path.display()))
        })?;
        let temp = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(parent)
            .map_err(|e| DownloadError::IoError(e.to_string()))?;
        // Keep only the path; the guard still deletes it on early return
        let temp_path = temp.into_temp_path();

        let mut out = fs::File::create(&temp_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        out.flush().await?;
        drop(out);
        progress.finish_and_clear();

        if let Some(expected) = &file.sha256 {
            let actual = sha256_hex(&temp_path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(DownloadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        temp_path
            .persist(dest_path)
            .map_err(|e| DownloadError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// SHA-256 digest of a file as lowercase hex, read in 1 MiB chunks
async fn sha256_hex(path: &Path) -> Result<String, DownloadError> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
