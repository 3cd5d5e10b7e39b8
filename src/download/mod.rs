//! Download module: everything that happens once a download is started.
//!
//! - `transfer` - The background state machine and the chunk loop
//! - [`speed`] - Per-chunk speed samples and the low-speed policy
//! - [`filename`] - Output filename resolution
//! - [`summary`] - Shared transfer state, [`Status`] and [`Summary`]
//! - [`handle`] - The [`DownloadHandle`] returned by `start`

pub mod filename;
pub mod handle;
pub mod speed;
pub mod summary;
pub(crate) mod transfer;

pub use handle::DownloadHandle;
pub use speed::{LowSpeedPolicy, SpeedMonitor, Verdict};
pub use summary::{Status, Summary, TransferState};
