//! Transfer state and summaries.
//!
//! [`TransferState`] is written by the background transfer and read by
//! whoever polls the [`Downloader`](crate::Downloader). [`Summary`] is an
//! owned snapshot of it, returned once the transfer is over.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tokio::sync::watch;

/// Lifecycle of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `start` has not been called yet.
    NotStarted,
    /// The transfer is running.
    Running,
    /// Every byte was written to disk.
    Finished,
    /// The transfer stopped early, with the reason.
    Aborted(String),
}

impl Status {
    /// Whether this is one of the two terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Finished | Status::Aborted(_))
    }
}

/// State shared between a downloader and its background transfer.
#[derive(Debug)]
pub struct TransferState {
    status: watch::Sender<Status>,
    filename: OnceLock<String>,
    output_path: OnceLock<PathBuf>,
    total_bytes: AtomicU64,
    speed: AtomicU64,
}

impl Default for TransferState {
    fn default() -> Self {
        Self {
            status: watch::Sender::new(Status::NotStarted),
            filename: OnceLock::new(),
            output_path: OnceLock::new(),
            total_bytes: AtomicU64::new(0),
            speed: AtomicU64::new(0),
        }
    }
}

impl TransferState {
    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Moves `NotStarted` to `Running`. Returns false if it already left
    /// `NotStarted`.
    pub(crate) fn begin(&self) -> bool {
        self.status.send_if_modified(|status| {
            if *status == Status::NotStarted {
                *status = Status::Running;
                true
            } else {
                false
            }
        })
    }

    /// Enters `Finished` unless a terminal state was already reached.
    pub(crate) fn finish(&self) -> bool {
        self.terminate(Status::Finished)
    }

    /// Enters `Aborted` unless a terminal state was already reached.
    pub(crate) fn abort(&self, reason: impl Into<String>) -> bool {
        self.terminate(Status::Aborted(reason.into()))
    }

    fn terminate(&self, terminal: Status) -> bool {
        self.status.send_if_modified(|status| {
            if status.is_terminal() {
                return false;
            }
            *status = terminal;
            true
        })
    }

    /// Whether the transfer finished.
    pub fn is_finished(&self) -> bool {
        matches!(*self.status.borrow(), Status::Finished)
    }

    /// Whether the transfer was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(*self.status.borrow(), Status::Aborted(_))
    }

    /// The abort reason, if aborted.
    pub fn abort_reason(&self) -> Option<String> {
        match &*self.status.borrow() {
            Status::Aborted(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Name of the output file, once resolved.
    pub fn filename(&self) -> Option<&str> {
        self.filename.get().map(String::as_str)
    }

    /// Path of the output file, once resolved.
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.get()
    }

    /// Records the output location. Only the first call has any effect.
    pub(crate) fn resolve_output(&self, filename: String, path: PathBuf) {
        if self.filename.set(filename).is_ok() {
            let _ = self.output_path.set(path);
        }
    }

    /// Bytes written so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Acquire)
    }

    /// Speed of the last chunk, in bytes/sec.
    pub fn speed(&self) -> u64 {
        self.speed.load(Ordering::Acquire)
    }

    /// Adds a written chunk to the totals.
    pub(crate) fn record_chunk(&self, bytes: u64, bytes_per_sec: u64) {
        self.total_bytes.fetch_add(bytes, Ordering::AcqRel);
        self.speed.store(bytes_per_sec, Ordering::Release);
    }

    /// Owned snapshot of the current state.
    pub fn summary(&self) -> Summary {
        Summary {
            status: self.status(),
            filename: self.filename().map(String::from),
            output_path: self.output_path().cloned(),
            total_bytes: self.total_bytes(),
            speed: self.speed(),
        }
    }
}

/// Snapshot of a download once its task is done.
#[derive(Debug, Clone)]
pub struct Summary {
    status: Status,
    filename: Option<String>,
    output_path: Option<PathBuf>,
    total_bytes: u64,
    speed: u64,
}

impl Summary {
    /// Final lifecycle state.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Name of the output file, if one was created.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Path of the output file, if one was created.
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }

    /// Bytes written to the output file.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Speed of the last chunk, in bytes/sec.
    pub fn speed(&self) -> u64 {
        self.speed
    }

    /// `Err(Error::Aborted)` if the download was aborted.
    pub fn into_result(self) -> crate::Result<Self> {
        match self.status {
            Status::Aborted(ref reason) => Err(crate::Error::Aborted(reason.clone())),
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_exclusive() {
        let state = TransferState::default();
        assert!(state.begin());
        assert!(!state.begin());

        assert!(state.finish());
        assert!(!state.abort("late"));
        assert!(state.is_finished());
        assert!(!state.is_aborted());
        assert_eq!(state.abort_reason(), None);
    }

    #[test]
    fn abort_keeps_first_reason() {
        let state = TransferState::default();
        state.begin();
        assert!(state.abort("first"));
        assert!(!state.abort("second"));
        assert!(!state.finish());
        assert_eq!(state.abort_reason().as_deref(), Some("first"));
    }

    #[test]
    fn output_resolves_once() {
        let state = TransferState::default();
        state.resolve_output("a.bin".into(), PathBuf::from("/tmp/a.bin"));
        state.resolve_output("b.bin".into(), PathBuf::from("/tmp/b.bin"));
        assert_eq!(state.filename(), Some("a.bin"));
        assert_eq!(state.output_path(), Some(&PathBuf::from("/tmp/a.bin")));
    }

    #[test]
    fn chunks_accumulate() {
        let state = TransferState::default();
        state.record_chunk(100, 50);
        state.record_chunk(28, 7);
        assert_eq!(state.total_bytes(), 128);
        assert_eq!(state.speed(), 7);
    }

    #[test]
    fn aborted_summary_into_error() {
        let state = TransferState::default();
        state.begin();
        state.abort("too slow");
        let err = state.summary().into_result().unwrap_err();
        assert_eq!(err.to_string(), "too slow");
    }
}
