//! Stream a single HTTP(S) resource to disk, asynchronously.
//!
//! A [`Downloader`] fetches one URL once. It reads the body in fixed-size
//! chunks, writes and flushes each one before reading the next, measures the
//! speed of every chunk and gives up when the transfer is too slow. Progress
//! is observed by polling its state or by awaiting it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use async_downloader::{DownloaderBuilder, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let dl = DownloaderBuilder::new()
//!     .url("http://www.ovh.net/files/1Mio.dat")
//!     .directory("output")
//!     .build()?;
//! dl.start()?;
//! dl.wait().await?;
//! dl.abort_exception()?;
//! println!("{:?}: {}", dl.output_path(), dl.pretty_total_bytes());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`downloader`] - The `Downloader`, its builder and configuration
//! - [`download`] - The background transfer, speed policy, filenames and state
//! - [`http`] - HTTP client and the shared `Transport`
//! - [`error`] - Centralized error handling with the `Error` enum

pub mod download;
pub mod downloader;
pub mod error;
pub mod http;

pub use download::{DownloadHandle, LowSpeedPolicy, Status, Summary};
pub use downloader::{Downloader, DownloaderBuilder, FlushPolicy};
pub use error::{Error, Result};
pub use http::{Transport, TransportBuilder};
