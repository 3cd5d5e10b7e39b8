//! HTTP client setup and middleware configuration.
//!
//! Builds the reqwest client every [`Transport`](super::Transport) sits on.
//! The client is tuned for long streaming bodies:
//!
//! - **No total timeout**: a transfer may take as long as it needs; the only
//!   bound on a stalled body is the low-speed policy of the transfer loop.
//! - **Short connect timeout**: connection setup still fails fast.
//! - **TCP_NODELAY**: Nagle's algorithm is disabled.
//! - **Decompression**: gzip and deflate bodies are decoded transparently.
//! - **Tracing**: every request goes through [`TracingMiddleware`].
//!
//! # Example
//!
//! ```rust
//! use async_downloader::http::{create_http_client, HttpClientConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! # Ok(())
//! # }
//! ```

use reqwest::header::HeaderMap;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Time allowed to establish a connection to the remote host.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection setup timeout. The transfer itself is never timed out.
    pub connect_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub max_idle_per_host: usize,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_idle_per_host: 2,
            headers: None,
        }
    }
}

/// Creates an HTTP client with middleware configuration.
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let mut inner_client_builder = reqwest::Client::builder()
        .tcp_nodelay(true)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .gzip(true)
        .deflate(true);

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, USER_AGENT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_idle_per_host, 2);
        assert!(config.headers.is_none());
    }

    #[test]
    fn test_create_http_client_default() {
        let client = create_http_client(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            headers: Some(headers),
            ..HttpClientConfig::default()
        };

        assert!(create_http_client(config).is_ok());
    }
}
