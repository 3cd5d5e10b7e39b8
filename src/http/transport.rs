//! The transport shared by a group of downloaders.
//!
//! A [`Transport`] bundles one HTTP client with the settings that apply to
//! every download running through it: the connection limit, a default user
//! agent and cancellation. Cloning a transport is cheap and every clone is
//! part of the same group, so cancelling through any clone (or through any
//! [`Downloader`](crate::Downloader) attached to it) affects all of them.
//!
//! ```rust
//! use async_downloader::{DownloaderBuilder, Transport};
//!
//! # fn example() -> Result<(), async_downloader::Error> {
//! let transport = Transport::builder().max_concurrent_downloads(4).build()?;
//! let first = DownloaderBuilder::new()
//!     .url("https://example.com/a.bin")
//!     .transport(transport.clone())
//!     .build()?;
//! let second = DownloaderBuilder::new()
//!     .url("https://example.com/b.bin")
//!     .transport(transport)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::client::{create_http_client, HttpClientConfig, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{Error, Result};

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::ClientWithMiddleware;
use std::{cmp::Ordering, fmt, sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Connection limit of a transport nobody configured.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 2;

/// A cloneable handle on a shared HTTP client, connection limit and
/// cancellation scope.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    client: ClientWithMiddleware,
    permits: Arc<Semaphore>,
    limit: Mutex<Limit>,
    cancel: Mutex<CancellationToken>,
}

#[derive(Debug)]
struct Limit {
    current: usize,
    /// Permits still checked out that must be retired instead of returned
    /// because the limit was lowered while they were in use.
    owed: usize,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("connection_limit", &self.connection_limit())
            .field("available", &self.inner.permits.available_permits())
            .finish()
    }
}

impl Transport {
    /// Creates a builder with the default options.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Creates a transport with the default options.
    pub fn new() -> Result<Self> {
        TransportBuilder::default().build()
    }

    /// The HTTP client requests are issued with.
    pub fn client(&self) -> &ClientWithMiddleware {
        &self.inner.client
    }

    /// Current connection limit of the group.
    pub fn connection_limit(&self) -> usize {
        self.inner.limit.lock().current
    }

    /// Changes the connection limit of the group.
    ///
    /// Raising the limit releases waiting transfers right away. Lowering it
    /// takes effect as running transfers hand their permits back.
    pub fn set_connection_limit(&self, limit: usize) -> Result<()> {
        validate_connection_limit(limit)?;

        let mut state = self.inner.limit.lock();
        match limit.cmp(&state.current) {
            Ordering::Greater => {
                let extra = limit - state.current;
                let repaid = extra.min(state.owed);
                state.owed -= repaid;
                self.inner.permits.add_permits(extra - repaid);
            }
            Ordering::Less => {
                let excess = state.current - limit;
                let forgotten = self.inner.permits.forget_permits(excess);
                state.owed += excess - forgotten;
            }
            Ordering::Equal => {}
        }
        state.current = limit;
        debug!("Connection limit set to {}", limit);
        Ok(())
    }

    /// Waits for a free connection slot.
    pub async fn acquire(&self) -> Result<ConnectionPermit> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(format!("connection limiter closed: {}", e)))?;

        Ok(ConnectionPermit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Token cancelled by the next [`cancel_pending`](Self::cancel_pending).
    ///
    /// Transfers take a child of this token when they start, so a transfer
    /// can also be cancelled on its own without touching the group.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.lock().clone()
    }

    /// Cancels every request currently in flight on this transport.
    ///
    /// Requests issued afterwards are not affected. Calling it with nothing
    /// in flight is a no-op.
    pub fn cancel_pending(&self) {
        let mut token = self.inner.cancel.lock();
        token.cancel();
        *token = CancellationToken::new();
        debug!("Cancelled pending requests");
    }
}

/// A slot in the transport's connection limit, held for a whole transfer.
pub struct ConnectionPermit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPermit").finish_non_exhaustive()
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        let mut state = self.inner.limit.lock();
        if state.owed > 0 {
            state.owed -= 1;
            permit.forget();
        }
    }
}

/// A builder used to create a [`Transport`].
#[derive(Debug)]
pub struct TransportBuilder {
    max_concurrent_downloads: usize,
    connect_timeout: Duration,
    user_agent: Option<String>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: None,
        }
    }
}

impl TransportBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of transfers allowed to run at once.
    pub fn max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.max_concurrent_downloads = limit;
        self
    }

    /// Set the connection setup timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a user agent sent by every download of the group.
    ///
    /// A downloader's own user agent takes precedence over this one.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Create the [`Transport`] with the specified options.
    pub fn build(self) -> Result<Transport> {
        validate_connection_limit(self.max_concurrent_downloads)?;

        let headers = match self.user_agent {
            Some(ref ua) if !ua.trim().is_empty() => {
                let value = HeaderValue::from_str(ua)
                    .map_err(|e| Error::Config(format!("invalid user agent {:?}: {}", ua, e)))?;
                Some(HeaderMap::from_iter([(USER_AGENT, value)]))
            }
            _ => None,
        };

        let client = create_http_client(HttpClientConfig {
            connect_timeout: self.connect_timeout,
            max_idle_per_host: self.max_concurrent_downloads,
            headers,
        })?;

        Ok(Transport {
            inner: Arc::new(Inner {
                client,
                permits: Arc::new(Semaphore::new(self.max_concurrent_downloads)),
                limit: Mutex::new(Limit {
                    current: self.max_concurrent_downloads,
                    owed: 0,
                }),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        })
    }
}

pub(crate) fn validate_connection_limit(limit: usize) -> Result<()> {
    if limit < 1 {
        return Err(Error::Config(
            "The max concurrent downloads should be at least 1".into(),
        ));
    }
    Ok(())
}
