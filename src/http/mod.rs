//! HTTP module containing the client and the shared transport.
//!
//! - [`client`] - HTTP client creation and middleware configuration
//! - [`transport`] - The [`Transport`] a group of downloaders shares
//!
//! # Example
//!
//! ```rust
//! use async_downloader::http::Transport;
//!
//! # fn example() -> Result<(), async_downloader::Error> {
//! let transport = Transport::builder()
//!     .max_concurrent_downloads(3)
//!     .user_agent("MyApp/1.0")
//!     .build()?;
//! transport.cancel_pending();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod transport;

pub use client::{create_http_client, HttpClientConfig};
pub use transport::{ConnectionPermit, Transport, TransportBuilder};
