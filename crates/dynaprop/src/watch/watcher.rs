//! Background thread that turns file system events into
//! [`FileSource::reload`] calls.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::builder::{ErrorCallback, ReloadCallback};
use super::types::{ReloadTrigger, WatchError};
use crate::file::FileSource;

/// Commands sent to the watcher thread.
#[derive(Clone, Debug)]
pub(crate) enum WatchCommand {
    /// Reload now, bypassing the debounce.
    Reload,
    /// Stop the watcher.
    Stop,
}

/// State shared between the watcher thread and its handles.
pub(crate) struct WatcherState {
    running: AtomicBool,
    reloads: AtomicU64,
}

impl WatcherState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            reloads: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Acquire)
    }
}

/// Callbacks and source the watcher thread reloads into.
pub(crate) struct Reloader {
    pub(crate) source: Arc<FileSource>,
    pub(crate) on_reload: Option<ReloadCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

/// Owns the watcher thread. Dropping it stops and joins the thread.
pub(crate) struct FileWatcher {
    state: Arc<WatcherState>,
    command_tx: Sender<WatchCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FileWatcher {
    /// Starts watching `reloader.source`'s file.
    pub(crate) fn start(reloader: Reloader, debounce: Duration) -> Result<Self, WatchError> {
        let path = reloader.source.path().to_path_buf();
        let state = Arc::new(WatcherState::new());

        let (command_tx, command_rx) = bounded::<WatchCommand>(16);
        let (notify_tx, notify_rx) = bounded::<notify::Result<Event>>(100);

        let mut watcher = create_notify_watcher(notify_tx)?;
        let watched_paths = watch_path(&mut watcher, &path)?;

        let thread_state = state.clone();
        let thread_handle = thread::Builder::new()
            .name("dynaprop-watcher".to_string())
            .spawn(move || {
                let looper = WatchLoop {
                    state: thread_state,
                    reloader,
                    debounce,
                    watched_paths,
                };
                looper.run(&command_rx, &notify_rx, watcher);
            })
            .map_err(|e| {
                WatchError::init_failed(format!("failed to spawn watcher thread: {e}"), None)
            })?;

        tracing::debug!(path = %path.display(), ?debounce, "started property file watcher");

        Ok(Self {
            state,
            command_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }

    pub(crate) fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Requests a reload that runs on the watcher thread.
    pub(crate) fn request_reload(&self) -> Result<(), WatchError> {
        if !self.state.is_running() {
            return Err(WatchError::Stopped);
        }

        self.command_tx
            .send(WatchCommand::Reload)
            .map_err(|_| WatchError::channel_error("failed to send reload command"))
    }

    /// Stops the watcher and waits for its thread, unless called from it.
    pub(crate) fn stop(&self) {
        self.state.stop();
        let _ = self.command_tx.try_send(WatchCommand::Stop);

        let Some(handle) = self.thread_handle.lock().take() else {
            return;
        };

        // A callback running on the watcher thread may drop the last handle.
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WatchLoop {
    state: Arc<WatcherState>,
    reloader: Reloader,
    debounce: Duration,
    watched_paths: HashSet<PathBuf>,
}

impl WatchLoop {
    fn run(
        &self,
        command_rx: &Receiver<WatchCommand>,
        notify_rx: &Receiver<notify::Result<Event>>,
        _watcher: RecommendedWatcher, // Keep watcher alive
    ) {
        let mut pending_reload: Option<ReloadTrigger> = None;
        let mut last_event = Instant::now();

        while self.state.is_running() {
            select! {
                recv(command_rx) -> cmd => {
                    match cmd {
                        Ok(WatchCommand::Reload) => {
                            pending_reload = None;
                            self.reload(&ReloadTrigger::Manual);
                        }

                        Ok(WatchCommand::Stop) | Err(_) => {
                            self.state.stop();
                            break;
                        }
                    }
                }

                recv(notify_rx) -> event_result => {
                    match event_result {
                        Ok(Ok(event)) => {
                            if let Some(trigger) = self.classify(&event) {
                                pending_reload = Some(trigger);
                                last_event = Instant::now();
                            }
                        }

                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "file watcher reported an error");
                        }

                        Err(_) => {
                            self.state.stop();
                            break;
                        }
                    }
                }

                default(self.debounce) => {
                    if let Some(trigger) = pending_reload.take() {
                        if last_event.elapsed() >= self.debounce {
                            self.reload(&trigger);
                        } else {
                            pending_reload = Some(trigger);
                        }
                    }
                }
            }
        }

        tracing::debug!("property file watcher stopped");
    }

    /// Returns a trigger if the event touches the watched file.
    fn classify(&self, event: &Event) -> Option<ReloadTrigger> {
        let path = event.paths.iter().find(|path| {
            self.watched_paths.contains(*path)
                || path
                    .canonicalize()
                    .is_ok_and(|c| self.watched_paths.contains(&c))
        })?;

        match event.kind {
            EventKind::Create(_) => Some(ReloadTrigger::FileCreated(path.clone())),
            EventKind::Modify(_) => Some(ReloadTrigger::FileModified(path.clone())),
            EventKind::Remove(_) => Some(ReloadTrigger::FileDeleted(path.clone())),
            _ => None,
        }
    }

    fn reload(&self, trigger: &ReloadTrigger) {
        let source = &self.reloader.source;

        match source.reload() {
            Ok(summary) => {
                self.state.reloads.fetch_add(1, Ordering::AcqRel);

                tracing::debug!(
                    path = %source.path().display(),
                    %trigger,
                    changed = summary.changed(),
                    rejected = summary.rejected.len(),
                    "reloaded property file"
                );

                if let Some(on_reload) = &self.reloader.on_reload {
                    on_reload(&summary);
                }
            }

            Err(e) => {
                let err = WatchError::from(e);
                tracing::warn!(
                    path = %source.path().display(),
                    %trigger,
                    error = %err,
                    "property file reload failed, keeping previous values"
                );

                if let Some(on_error) = &self.reloader.on_error {
                    on_error(&err);
                }
            }
        }
    }
}

/// Creates a notify watcher that forwards into `tx`.
fn create_notify_watcher(tx: Sender<notify::Result<Event>>) -> Result<RecommendedWatcher, WatchError> {
    notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })
    .map_err(|e| WatchError::init_failed(format!("failed to create file watcher: {e}"), Some(e)))
}

/// Watches the parent directory of `path`, so replaced files keep being seen.
///
/// Returns every spelling of `path` that events may carry.
fn watch_path(watcher: &mut RecommendedWatcher, path: &Path) -> Result<HashSet<PathBuf>, WatchError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| WatchError::path_error(path, "invalid path"))?;

    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(WatchError::path_error(path, "invalid path")),
    };

    if !parent.exists() {
        return Err(WatchError::path_error(path, "parent directory does not exist"));
    }

    watcher
        .watch(parent, RecursiveMode::NonRecursive)
        .map_err(|e| WatchError::path_error(path, format!("failed to watch: {e}")))?;

    let mut paths = HashSet::from([path.to_path_buf()]);
    if let Ok(canonical_parent) = parent.canonicalize() {
        paths.insert(canonical_parent.join(file_name));
    }
    if let Ok(canonical) = path.canonicalize() {
        paths.insert(canonical);
    }

    Ok(paths)
}
