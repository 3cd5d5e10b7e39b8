//! The background transfer.
//!
//! One [`Transfer`] runs per download: it waits for a connection slot, issues
//! the request, resolves the output file and then copies the body to disk
//! chunk by chunk until the body ends, the low-speed policy trips, or the
//! transfer is cancelled. Every failure is turned into the aborted state;
//! nothing escapes the task.

use super::filename;
use super::speed::{bytes_per_sec, LowSpeedPolicy, SpeedMonitor, Verdict};
use super::summary::TransferState;
use crate::downloader::config::FlushPolicy;
use crate::error::{Error, Result};
use crate::http::Transport;

use futures::{FutureExt, TryStreamExt};
use reqwest::{
    header::{HeaderValue, USER_AGENT},
    Url,
};
use std::{any::Any, future::Future, io, panic::AssertUnwindSafe, path::PathBuf, sync::Arc};
use tokio::{
    fs::OpenOptions,
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter},
    time::Instant,
};
use tokio_util::{io::StreamReader, sync::CancellationToken};
use tracing::{debug, info, warn};

/// How the chunk loop reads, writes and judges speed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkSettings {
    pub buffer_size: usize,
    pub flush_policy: FlushPolicy,
    pub low_speed: LowSpeedPolicy,
}

/// Why the chunk loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// The body ended and everything was flushed.
    Complete,
    /// The low-speed policy tripped.
    TooSlow,
    /// The cancellation token fired.
    Cancelled,
}

enum Failure {
    Setup(Error),
    Stream(Error),
}

/// Everything a transfer needs, captured when the download starts.
#[derive(Debug)]
pub(crate) struct Transfer {
    pub url: Url,
    pub directory: PathBuf,
    pub user_agent: Option<HeaderValue>,
    pub settings: ChunkSettings,
}

impl Transfer {
    /// Runs the transfer to a terminal state.
    pub(crate) async fn run(
        self,
        transport: Transport,
        state: Arc<TransferState>,
        cancel: CancellationToken,
    ) {
        let url = self.url.clone();
        let task_state = Arc::clone(&state);
        supervise(&state, &url, self.settle(transport, task_state, cancel)).await;
    }

    async fn settle(
        self,
        transport: Transport,
        state: Arc<TransferState>,
        cancel: CancellationToken,
    ) {
        let outcome = self.execute(&transport, &state, &cancel).await;

        match outcome {
            Ok(LoopExit::Complete) => {
                if state.finish() {
                    info!(
                        "Downloaded {} ({} bytes) to {:?}",
                        self.url,
                        state.total_bytes(),
                        state.output_path()
                    );
                }
            }
            Ok(LoopExit::TooSlow) => {
                transport.cancel_pending();
                let reason = format!(
                    "The download speed is too low (at or below {} B/s)",
                    self.settings.low_speed.threshold
                );
                warn!("Aborting {}: {}", self.url, reason);
                state.abort(reason);
            }
            Ok(LoopExit::Cancelled) => {
                warn!("Download of {} cancelled", self.url);
                state.abort(format!("The download of {} was cancelled", self.url));
            }
            Err(Failure::Setup(e)) => {
                warn!("Could not download {}: {}", self.url, e);
                state.abort(format!(
                    "An error occurred while trying to download {}: {}",
                    self.url, e
                ));
            }
            Err(Failure::Stream(e)) => {
                warn!("Download of {} failed: {}", self.url, e);
                state.abort(format!(
                    "An error occurred while downloading {}: {}",
                    self.url, e
                ));
            }
        }
    }

    async fn execute(
        &self,
        transport: &Transport,
        state: &TransferState,
        cancel: &CancellationToken,
    ) -> std::result::Result<LoopExit, Failure> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
            permit = transport.acquire() => permit.map_err(Failure::Setup)?,
        };

        debug!("Fetching {}", &self.url);
        let mut request = transport.client().get(self.url.clone());
        if let Some(ref ua) = self.user_agent {
            request = request.header(USER_AGENT, ua.clone());
        }

        // Only the headers are read here; the body is streamed below.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
            response = request.send() => response.map_err(|e| Failure::Setup(e.into()))?,
        };
        let response = response
            .error_for_status()
            .map_err(|e| Failure::Setup(e.into()))?;

        if state.output_path().is_none() {
            let name = filename::resolve(response.headers(), &self.url);
            let (name, path) = filename::unique_path(&self.directory, &name);
            state.resolve_output(name, path);
        }
        let output = state
            .output_path()
            .cloned()
            .ok_or_else(|| Failure::Setup(Error::Internal("output path not resolved".into())))?;

        debug!("Creating destination file {:?}", &output);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&output)
            .await
            .map_err(|e| Failure::Setup(e.into()))?;
        let mut writer = BufWriter::with_capacity(self.settings.buffer_size, file);

        let body = response.bytes_stream().map_err(io::Error::other);
        let mut reader = StreamReader::new(Box::pin(body));

        debug!("Retrieving chunks...");
        let copied = copy_chunks(&mut reader, &mut writer, self.settings, state, cancel).await;

        // Chunks counted in the totals must reach the file on every exit.
        let flushed = writer.flush().await;
        let exit = copied.map_err(Failure::Stream)?;
        match (exit, flushed) {
            (LoopExit::Complete, Ok(())) => writer
                .get_ref()
                .sync_all()
                .await
                .map_err(|e| Failure::Stream(e.into()))?,
            (LoopExit::Complete, Err(e)) => return Err(Failure::Stream(e.into())),
            (_, Err(e)) => warn!("Could not flush {:?}: {}", &output, e),
            (_, Ok(())) => {}
        }

        Ok(exit)
    }
}

/// Drives `task` to completion, turning a panic into the aborted state.
pub(crate) async fn supervise<F>(state: &TransferState, url: &Url, task: F)
where
    F: Future<Output = ()>,
{
    if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
        let message = panic_message(&*panic);
        warn!("Download task for {} panicked: {}", url, message);
        state.abort(format!(
            "An unexpected error occurred while downloading {}: {}",
            url, message
        ));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "task panicked"
    }
}

/// Copies `reader` into `writer` one buffer at a time.
///
/// Each chunk's speed is its size over the time its read took. The loop
/// stops at end of stream, when the low-speed policy trips, or when
/// `cancel` fires while a read is pending.
pub(crate) async fn copy_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    settings: ChunkSettings,
    state: &TransferState,
    cancel: &CancellationToken,
) -> Result<LoopExit>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; settings.buffer_size];
    let mut monitor = SpeedMonitor::new(settings.low_speed);
    let mut chunks: u64 = 0;

    loop {
        let started = Instant::now();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
            read = reader.read(&mut buffer) => read?,
        };
        let elapsed = started.elapsed();

        if read == 0 {
            writer.flush().await?;
            return Ok(LoopExit::Complete);
        }

        writer.write_all(&buffer[..read]).await?;
        chunks += 1;
        if settings.flush_policy.flush_after(chunks) {
            writer.flush().await?;
        }

        let speed = bytes_per_sec(read, elapsed);
        state.record_chunk(read as u64, speed);

        if monitor.record(speed) == Verdict::TooSlow {
            return Ok(LoopExit::TooSlow);
        }
    }
}
