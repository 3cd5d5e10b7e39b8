//! Builder pattern implementation for creating [`Downloader`] instances.
//!
//! The builder collects values without checking them; [`build`] applies the
//! same validation as the [`Downloader`] setters and reports the first
//! problem.
//!
//! ```rust
//! use async_downloader::{DownloaderBuilder, FlushPolicy};
//!
//! # fn example() -> Result<(), async_downloader::Error> {
//! let downloader = DownloaderBuilder::new()
//!     .url("https://example.com/archive.zip")
//!     .buffer_size(64 * 1024)
//!     .flush_policy(FlushPolicy::EveryChunks(16))
//!     .user_agent("MyApp/1.0")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`build`]: DownloaderBuilder::build

use super::{config::DownloaderConfig, config::FlushPolicy, downloader::Downloader};
use crate::download::LowSpeedPolicy;
use crate::error::Result;
use crate::http::Transport;

use std::path::PathBuf;

/// A builder used to create a [`Downloader`].
#[derive(Debug, Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
    transport: Option<Transport>,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Sets the URL to download.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Sets the directory where to store the download.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = Some(directory.into());
        self
    }

    /// Sets the user agent sent with the request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the chunk size in bytes.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Sets the connection limit applied to the transport on start.
    pub fn max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.config.max_concurrent_downloads = Some(limit);
        self
    }

    /// Sets how often written chunks are flushed.
    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.config.flush_policy = policy;
        self
    }

    /// Sets the low-speed abort policy.
    pub fn low_speed_policy(mut self, policy: LowSpeedPolicy) -> Self {
        self.config.low_speed = policy;
        self
    }

    /// Shares a transport with other downloaders.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    pub fn build(self) -> Result<Downloader> {
        let DownloaderBuilder { config, transport } = self;
        let mut downloader = Downloader::from_config(DownloaderConfig::default(), transport);

        if let Some(url) = config.url {
            downloader.set_url(url)?;
        }
        if let Some(directory) = config.directory {
            downloader.set_location(directory)?;
        }
        if let Some(user_agent) = config.user_agent {
            downloader.set_user_agent(user_agent);
        }
        downloader.set_buffer_size(config.buffer_size)?;
        if let Some(limit) = config.max_concurrent_downloads {
            downloader.set_max_concurrent_downloads(limit)?;
        }
        downloader.set_flush_policy(config.flush_policy)?;
        downloader.set_low_speed_policy(config.low_speed)?;

        Ok(downloader)
    }
}
