use super::summary::{Summary, TransferState};
use crate::error::{Error, Result};

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle on a running download, returned by
/// [`Downloader::start`](crate::Downloader::start).
///
/// Awaiting [`wait`](Self::wait) joins the background task. Dropping the
/// handle detaches it; the downloader's polled state keeps updating.
#[derive(Debug)]
pub struct DownloadHandle {
    task: JoinHandle<()>,
    state: Arc<TransferState>,
    cancel: CancellationToken,
}

impl DownloadHandle {
    pub(crate) fn new(
        task: JoinHandle<()>,
        state: Arc<TransferState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            state,
            cancel,
        }
    }

    /// Cancels this download only. It ends in the aborted state.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the background task and returns the final state.
    ///
    /// An aborted download is still `Ok`: inspect [`Summary::status`] or call
    /// [`Summary::into_result`].
    pub async fn wait(self) -> Result<Summary> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("download task failed: {}", e)))?;
        Ok(self.state.summary())
    }
}
