//! Hot reload for file-backed sources.
//!
//! Enabled with the `watch` feature flag. A [`WatchBuilder`] starts a
//! background thread that watches a [`FileSource`](crate::file::FileSource)'s
//! file and calls [`reload`](crate::file::FileSource::reload) once the file
//! has been quiet for the debounce period. Each reload raises add, update and
//! remove events, so bound registries validate and apply every change.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌────────────────┐     ┌──────────┐
//! │   notify    │────▶│  FileWatcher  │────▶│   FileSource   │────▶│ Registry │
//! │  (events)   │     │  (debounce)   │     │ reload + apply │     │ (events) │
//! └─────────────┘     └───────────────┘     └────────────────┘     └──────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────────────┐
//!                     │ on_reload / on_error │
//!                     └──────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! When a reload fails (e.g. the file is half-written and does not parse),
//! the source keeps its previous values and the error is passed to the
//! `on_error` callback if one is registered.

mod builder;
mod handle;
mod types;
mod watcher;

pub use builder::{ErrorCallback, ReloadCallback, WatchBuilder};
pub use handle::WatchHandle;
pub use types::{ReloadTrigger, WatchError};
