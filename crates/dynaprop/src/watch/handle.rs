//! User-facing handle for a running file watcher.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use super::types::WatchError;
use super::watcher::FileWatcher;

/// Handle for controlling a running file watcher.
///
/// The handle is cheaply cloneable; all clones control the same watcher.
/// Dropping the last clone stops the watcher.
///
/// # Example
///
/// ```ignore
/// // Force a reload after an out-of-band change
/// handle.reload()?;
///
/// // Stop watching
/// handle.stop();
/// ```
#[derive(Clone)]
pub struct WatchHandle {
    watcher: Arc<FileWatcher>,
}

impl WatchHandle {
    pub(crate) fn new(watcher: FileWatcher) -> Self {
        Self {
            watcher: Arc::new(watcher),
        }
    }

    /// Requests an immediate reload, bypassing the debounce.
    ///
    /// The reload runs on the watcher thread; this call does not wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Stopped`] if the watcher has been stopped,
    /// or [`WatchError::ChannelError`] if communication with the watcher failed.
    pub fn reload(&self) -> Result<(), WatchError> {
        self.watcher.request_reload()
    }

    /// Stops the watcher and waits for its thread to exit.
    ///
    /// The source keeps serving its last values.
    pub fn stop(&self) {
        self.watcher.stop();
    }

    /// Returns `false` once the watcher has stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.watcher.state().is_running()
    }

    /// Number of successful reloads so far.
    #[must_use]
    pub fn reload_count(&self) -> u64 {
        self.watcher.state().reload_count()
    }
}

impl Debug for WatchHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("running", &self.is_running())
            .field("reloads", &self.reload_count())
            .finish()
    }
}
