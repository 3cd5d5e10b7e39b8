//! Error handling for the downloader.
//!
//! Configuration faults are returned synchronously from the accessor that
//! detected them. Transfer faults never travel through this type while the
//! transfer runs: they end up in the polled state, and
//! [`Downloader::abort_exception`](crate::Downloader::abort_exception) turns
//! them back into an [`Error::Aborted`].

use std::io;
use thiserror::Error;

/// Errors that can happen when using the downloader.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration.
    ///
    /// Raised by setters and getters alike: a bad URL, a missing destination
    /// directory, or an out-of-range buffer size or concurrency limit.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The transfer ended in the aborted state.
    ///
    /// Carries the abort reason recorded by the background transfer.
    #[error("{0}")]
    Aborted(String),

    /// `start` was called on a downloader that already started.
    #[error("The download has already been started")]
    AlreadyStarted,

    /// Error from an underlying system.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O Error.
    #[error("I/O error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware stack wrapping the HTTP client.
    #[error("HTTP error: {source}")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

/// Result type alias for operations that can fail with a downloader error.
pub type Result<T> = std::result::Result<T, Error>;
