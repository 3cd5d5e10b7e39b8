//! The [`Downloader`]: configuration, start and polled state.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_downloader::Downloader;
//!
//! # async fn example() -> Result<(), async_downloader::Error> {
//! let mut dl = Downloader::new();
//! dl.set_url("http://www.ovh.net/files/1Mio.dat")?;
//! dl.set_location("downloads")?;
//!
//! let handle = dl.start()?;
//! while !dl.is_finished() && !dl.is_aborted() {
//!     println!("{} at {}", dl.pretty_total_bytes(), dl.pretty_speed());
//!     tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//! }
//! dl.abort_exception()?;
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

use super::config::{self, DownloaderConfig, FlushPolicy};
use crate::download::{
    transfer::{ChunkSettings, Transfer},
    DownloadHandle, LowSpeedPolicy, Status, Summary, TransferState,
};
use crate::error::{Error, Result};
use crate::http::{transport::validate_connection_limit, Transport};

use indicatif::HumanBytes;
use reqwest::header::HeaderValue;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Downloads one resource to disk, once.
///
/// Configure it, call [`start`](Self::start), then either poll the state
/// accessors or await [`wait`](Self::wait) / the returned
/// [`DownloadHandle`].
#[derive(Debug, Default)]
pub struct Downloader {
    config: DownloaderConfig,
    transport: OnceLock<Transport>,
    state: Arc<TransferState>,
}

impl Downloader {
    /// Creates an unconfigured downloader.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_config(config: DownloaderConfig, transport: Option<Transport>) -> Self {
        let downloader = Self {
            config,
            ..Self::default()
        };
        if let Some(transport) = transport {
            let _ = downloader.transport.set(transport);
        }
        downloader
    }

    /// Attaches the downloader to a shared transport.
    ///
    /// Without one, a private transport is built on [`start`](Self::start).
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = OnceLock::from(transport);
        self
    }

    /// The transport in use, once attached or built.
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.get()
    }

    /// Gets the URL to download.
    pub fn url(&self) -> Result<&str> {
        let url = self.config.url.as_deref().unwrap_or_default();
        config::validate_url(url)?;
        Ok(url)
    }

    /// Sets the URL to download. Only http and https are accepted.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        config::validate_url(&url)?;
        self.config.url = Some(url);
        Ok(())
    }

    /// Gets the directory the file is written to.
    ///
    /// Defaults to the current working directory.
    pub fn location(&self) -> Result<PathBuf> {
        config::resolve_directory(self.config.directory.as_deref())
    }

    /// Sets the directory the file is written to. It must exist.
    pub fn set_location(&mut self, directory: impl Into<PathBuf>) -> Result<()> {
        let directory = directory.into();
        config::validate_directory(&directory)?;
        self.config.directory = Some(directory);
        Ok(())
    }

    /// Gets the user agent sent with the request, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.config.user_agent.as_deref()
    }

    /// Sets the user agent sent with the request.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        self.config.user_agent = Some(user_agent.into());
    }

    /// Gets the chunk size, in bytes.
    pub fn buffer_size(&self) -> Result<usize> {
        config::validate_buffer_size(self.config.buffer_size)?;
        Ok(self.config.buffer_size)
    }

    /// Sets the chunk size, in bytes. Between 8 KiB and 64 MiB.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<()> {
        config::validate_buffer_size(size)?;
        self.config.buffer_size = size;
        Ok(())
    }

    /// Gets the connection limit.
    ///
    /// Falls back to the attached transport's limit, then to the default.
    pub fn max_concurrent_downloads(&self) -> Result<usize> {
        let limit = match (self.config.max_concurrent_downloads, self.transport.get()) {
            (Some(limit), _) => limit,
            (None, Some(transport)) => transport.connection_limit(),
            (None, None) => crate::http::transport::DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        };
        validate_connection_limit(limit)?;
        Ok(limit)
    }

    /// Sets the connection limit. It is applied to the transport on start,
    /// which affects every downloader sharing it.
    pub fn set_max_concurrent_downloads(&mut self, limit: usize) -> Result<()> {
        validate_connection_limit(limit)?;
        self.config.max_concurrent_downloads = Some(limit);
        Ok(())
    }

    /// Gets how often written chunks are flushed.
    pub fn flush_policy(&self) -> Result<FlushPolicy> {
        config::validate_flush_policy(self.config.flush_policy)?;
        Ok(self.config.flush_policy)
    }

    /// Sets how often written chunks are flushed.
    pub fn set_flush_policy(&mut self, policy: FlushPolicy) -> Result<()> {
        config::validate_flush_policy(policy)?;
        self.config.flush_policy = policy;
        Ok(())
    }

    /// Gets the policy that aborts slow transfers.
    pub fn low_speed_policy(&self) -> Result<LowSpeedPolicy> {
        config::validate_low_speed(self.config.low_speed)?;
        Ok(self.config.low_speed)
    }

    /// Sets the policy that aborts slow transfers.
    pub fn set_low_speed_policy(&mut self, policy: LowSpeedPolicy) -> Result<()> {
        config::validate_low_speed(policy)?;
        self.config.low_speed = policy;
        Ok(())
    }

    /// Starts the download in the background and returns right away.
    ///
    /// Must be called from within a tokio runtime. Configuration errors are
    /// returned here; transfer errors only ever show up as the aborted state.
    pub fn start(&self) -> Result<DownloadHandle> {
        if self.state.status() != Status::NotStarted {
            return Err(Error::AlreadyStarted);
        }

        let url = config::validate_url(self.url()?)?;
        let directory = self.location()?;
        let settings = ChunkSettings {
            buffer_size: self.buffer_size()?,
            flush_policy: self.flush_policy()?,
            low_speed: self.low_speed_policy()?,
        };
        let user_agent = match self.config.user_agent.as_deref() {
            Some(ua) if !ua.trim().is_empty() => Some(
                HeaderValue::from_str(ua)
                    .map_err(|e| Error::Config(format!("Invalid user agent {:?}: {}", ua, e)))?,
            ),
            _ => None,
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("no tokio runtime to start on: {}", e)))?;

        let transport = self.attach_transport()?;
        if let Some(limit) = self.config.max_concurrent_downloads {
            transport.set_connection_limit(limit)?;
        }

        if !self.state.begin() {
            return Err(Error::AlreadyStarted);
        }

        debug!("Starting download of {} into {:?}", url, directory);
        let cancel = transport.cancellation_token().child_token();
        let transfer = Transfer {
            url,
            directory,
            user_agent,
            settings,
        };
        let task = runtime.spawn(transfer.run(transport, Arc::clone(&self.state), cancel.clone()));

        Ok(DownloadHandle::new(task, Arc::clone(&self.state), cancel))
    }

    fn attach_transport(&self) -> Result<Transport> {
        if let Some(transport) = self.transport.get() {
            return Ok(transport.clone());
        }
        let transport = Transport::builder()
            .max_concurrent_downloads(self.max_concurrent_downloads()?)
            .build()?;
        Ok(self.transport.get_or_init(|| transport).clone())
    }

    /// Cancels every pending request on this downloader's transport,
    /// including those of other downloaders sharing it.
    pub fn cancel_downloads(&self) {
        if let Some(transport) = self.transport.get() {
            transport.cancel_pending();
        }
    }

    /// Returns the abort reason as an error, if the download was aborted.
    pub fn abort_exception(&self) -> Result<()> {
        match self.state.abort_reason() {
            Some(reason) if !reason.trim().is_empty() => Err(Error::Aborted(reason)),
            _ => Ok(()),
        }
    }

    /// Waits until the download reaches a terminal state.
    pub async fn wait(&self) -> Result<Status> {
        if self.state.status() == Status::NotStarted {
            return Err(Error::Internal("the download has not been started".into()));
        }
        let mut status = self.state.subscribe();
        let terminal = status
            .wait_for(Status::is_terminal)
            .await
            .map_err(|e| Error::Internal(format!("download state dropped: {}", e)))?
            .clone();
        Ok(terminal)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Snapshot of the state.
    pub fn summary(&self) -> Summary {
        self.state.summary()
    }

    /// True once every byte has been written to disk.
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// True once the download has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.state.is_aborted()
    }

    /// Why the download was aborted, if it was.
    pub fn abort_reason(&self) -> Option<String> {
        self.state.abort_reason()
    }

    /// Name of the file on disk, once the response has been received.
    pub fn filename(&self) -> Option<&str> {
        self.state.filename()
    }

    /// Full path of the file on disk, once the response has been received.
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.state.output_path()
    }

    /// Bytes written so far.
    pub fn total_bytes(&self) -> u64 {
        self.state.total_bytes()
    }

    /// Speed of the last chunk, in bytes per second.
    pub fn speed_bytes_per_sec(&self) -> u64 {
        self.state.speed()
    }

    /// Speed of the last chunk, human readable (`1.50 MiB/s`).
    pub fn pretty_speed(&self) -> String {
        format!("{}/s", HumanBytes(self.state.speed()))
    }

    /// Bytes written so far, human readable.
    pub fn pretty_total_bytes(&self) -> String {
        HumanBytes(self.state.total_bytes()).to_string()
    }
}
