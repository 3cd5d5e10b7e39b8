//! Configuration structures, defaults and validation rules.
//!
//! Every rule here is applied twice: when a value is stored and again each
//! time it is read back, so a configuration that went stale (a destination
//! directory removed after it was set, for instance) fails on access.

use crate::download::LowSpeedPolicy;
use crate::error::{Error, Result};

use reqwest::Url;
use std::env::current_dir;
use std::path::{Path, PathBuf};

/// Smallest accepted buffer size, in bytes.
pub const MIN_BUFFER_SIZE: usize = 8192;

/// Largest accepted buffer size, in bytes (64 MiB). The buffer is allocated
/// twice per transfer, once for reads and once for the file writer.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Buffer size used when none is configured, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 16384;

/// How often written chunks are flushed to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Flush after every chunk, before the next read starts.
    #[default]
    EveryChunk,
    /// Flush after every `n` chunks.
    EveryChunks(u64),
    /// Flush only when the body ends.
    OnCompletion,
}

impl FlushPolicy {
    /// Whether to flush once `chunks` chunks have been written.
    pub fn flush_after(&self, chunks: u64) -> bool {
        match *self {
            FlushPolicy::EveryChunk => true,
            FlushPolicy::EveryChunks(n) => n > 0 && chunks % n == 0,
            FlushPolicy::OnCompletion => false,
        }
    }
}

/// Configuration of a single download.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// URL to download. Mandatory.
    pub url: Option<String>,
    /// Directory where to store the file. Defaults to the working directory.
    pub directory: Option<PathBuf>,
    /// User agent sent with the request.
    pub user_agent: Option<String>,
    /// Size of one chunk, and of the file write buffer.
    pub buffer_size: usize,
    /// Connection limit applied to the transport on start, if set.
    pub max_concurrent_downloads: Option<usize>,
    /// Flush cadence.
    pub flush_policy: FlushPolicy,
    /// Low-speed abort policy.
    pub low_speed: LowSpeedPolicy,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            url: None,
            directory: None,
            user_agent: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_concurrent_downloads: None,
            flush_policy: FlushPolicy::default(),
            low_speed: LowSpeedPolicy::default(),
        }
    }
}

pub(crate) fn validate_url(url: &str) -> Result<Url> {
    if url.trim().is_empty() {
        return Err(Error::Config("Url is mandatory".into()));
    }
    let parsed = Url::parse(url)
        .map_err(|e| Error::Config(format!("Invalid url {:?}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::Config(format!(
            "Invalid url {:?}: a valid url must use http(s), not {}",
            url, scheme
        ))),
    }
}

pub(crate) fn validate_directory(directory: &Path) -> Result<()> {
    if !directory.is_dir() {
        return Err(Error::Config(format!(
            "Invalid path {:?}: no such directory",
            directory
        )));
    }
    Ok(())
}

/// The configured directory, or the working directory when unset.
pub(crate) fn resolve_directory(directory: Option<&Path>) -> Result<PathBuf> {
    let directory = match directory {
        Some(d) => d.to_path_buf(),
        None => current_dir()?,
    };
    validate_directory(&directory)?;
    Ok(directory)
}

pub(crate) fn validate_buffer_size(size: usize) -> Result<()> {
    if size < MIN_BUFFER_SIZE {
        return Err(Error::Config(format!(
            "The buffer size should be at least {} bytes, got {}",
            MIN_BUFFER_SIZE, size
        )));
    }
    if size > MAX_BUFFER_SIZE {
        return Err(Error::Config(format!(
            "The buffer size should be at most {} bytes, got {}",
            MAX_BUFFER_SIZE, size
        )));
    }
    Ok(())
}

pub(crate) fn validate_flush_policy(policy: FlushPolicy) -> Result<()> {
    if policy == FlushPolicy::EveryChunks(0) {
        return Err(Error::Config("Flush cadence should be at least 1 chunk".into()));
    }
    Ok(())
}

pub(crate) fn validate_low_speed(policy: LowSpeedPolicy) -> Result<()> {
    if policy.window < 1 {
        return Err(Error::Config(
            "The low-speed window should hold at least 1 chunk".into(),
        ));
    }
    Ok(())
}
