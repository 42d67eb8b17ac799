//! Builder for configuring a file watcher.

use std::sync::Arc;
use std::time::Duration;

use super::handle::WatchHandle;
use super::types::WatchError;
use super::watcher::{FileWatcher, Reloader};
use crate::file::{FileSource, ReloadSummary};

/// Callback invoked after each successful reload.
pub type ReloadCallback = Box<dyn Fn(&ReloadSummary) + Send + Sync + 'static>;

/// Callback invoked when a reload fails.
pub type ErrorCallback = Box<dyn Fn(&WatchError) + Send + Sync + 'static>;

/// Builder for watching a [`FileSource`]'s file.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use dynaprop::file::FileSource;
/// use dynaprop::watch::WatchBuilder;
///
/// # fn main() -> dynaprop::miette::Result<()> {
/// let source = Arc::new(FileSource::open("app.toml")?);
///
/// let handle = WatchBuilder::new(source)
///     .debounce(Duration::from_millis(200))
///     .on_reload(|summary| println!("{} properties changed", summary.changed()))
///     .on_error(|err| eprintln!("reload failed: {err}"))
///     .start()?;
///
/// handle.stop();
/// # Ok(())
/// # }
/// ```
pub struct WatchBuilder {
    source: Arc<FileSource>,
    debounce: Duration,
    on_reload: Option<ReloadCallback>,
    on_error: Option<ErrorCallback>,
}

impl WatchBuilder {
    /// Creates a builder for `source` with a 100ms debounce.
    #[must_use]
    pub fn new(source: Arc<FileSource>) -> Self {
        Self {
            source,
            debounce: Duration::from_millis(100),
            on_reload: None,
            on_error: None,
        }
    }

    /// Sets how long the file must stay quiet before it is reloaded.
    #[must_use]
    pub const fn debounce(mut self, duration: Duration) -> Self {
        self.debounce = duration;
        self
    }

    /// Registers a callback for successful reloads.
    #[must_use]
    pub fn on_reload<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ReloadSummary) + Send + Sync + 'static,
    {
        self.on_reload = Some(Box::new(callback));
        self
    }

    /// Registers a callback for failed reloads.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&WatchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Starts watching.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] if the file system watcher cannot be created
    /// or the file's directory cannot be watched.
    pub fn start(self) -> Result<WatchHandle, WatchError> {
        let reloader = Reloader {
            source: self.source,
            on_reload: self.on_reload,
            on_error: self.on_error,
        };

        let watcher = FileWatcher::start(reloader, self.debounce)?;
        Ok(WatchHandle::new(watcher))
    }
}
