//! Downloader module: the [`Downloader`], its builder and configuration.
//!
//! - `downloader` - The Downloader struct: accessors, start, polled state
//! - `builder` - DownloaderBuilder for fluent, validated construction
//! - `config` - Configuration structure, defaults and validation rules
//!
//! # Examples
//!
//! ## Setter style
//!
//! ```rust,no_run
//! use async_downloader::Downloader;
//!
//! # async fn example() -> Result<(), async_downloader::Error> {
//! let mut dl = Downloader::new();
//! dl.set_url("https://example.com/file.zip")?;
//! dl.set_buffer_size(32 * 1024)?;
//! dl.start()?;
//! dl.wait().await?;
//! dl.abort_exception()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Builder style, sharing a transport
//!
//! ```rust,no_run
//! use async_downloader::{DownloaderBuilder, Transport};
//!
//! # async fn example() -> Result<(), async_downloader::Error> {
//! let transport = Transport::new()?;
//! let dl = DownloaderBuilder::new()
//!     .url("https://example.com/file.zip")
//!     .directory("./downloads")
//!     .transport(transport.clone())
//!     .build()?;
//! let summary = dl.start()?.wait().await?.into_result()?;
//! println!("{} bytes", summary.total_bytes());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;

pub use builder::DownloaderBuilder;
pub use config::{DownloaderConfig, FlushPolicy};
pub use downloader::Downloader;
