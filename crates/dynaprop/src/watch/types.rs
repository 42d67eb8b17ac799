//! Watch errors and reload triggers.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use miette::Diagnostic;

use crate::file::FileError;

/// Errors raised while watching a property file.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize the file watcher.
    #[error("failed to initialize file watcher: {message}")]
    #[diagnostic(
        code(dynaprop::watch::init_failed),
        help("check that the file path exists and is accessible")
    )]
    InitFailed {
        /// Human-readable error message.
        message: String,
        /// The underlying notify error, if available.
        #[source]
        source: Option<notify::Error>,
    },

    /// Failed to watch a specific path.
    #[error("failed to watch path '{path}': {message}")]
    #[diagnostic(
        code(dynaprop::watch::path_error),
        help("ensure the path exists and you have read permissions")
    )]
    PathError {
        /// The path that could not be watched.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },

    /// Re-reading the file failed. The source keeps its previous values.
    #[error("property file reload failed")]
    #[diagnostic(
        code(dynaprop::watch::reload_failed),
        help("fix the file and save it again; the previous values remain active")
    )]
    ReloadFailed {
        /// Why the file could not be read or parsed.
        #[source]
        #[diagnostic_source]
        source: FileError,
    },

    /// The watcher has been stopped.
    #[error("watcher has been stopped")]
    #[diagnostic(
        code(dynaprop::watch::stopped),
        help("start a new watcher if you need to continue watching for changes")
    )]
    Stopped,

    /// Channel communication error.
    #[error("internal channel error: {message}")]
    #[diagnostic(code(dynaprop::watch::channel_error))]
    ChannelError {
        /// Human-readable error message.
        message: String,
    },
}

impl WatchError {
    /// Creates an `InitFailed` error.
    pub fn init_failed(message: impl Into<String>, source: Option<notify::Error>) -> Self {
        Self::InitFailed {
            message: message.into(),
            source,
        }
    }

    /// Creates a `PathError`.
    pub fn path_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a `ChannelError`.
    pub fn channel_error(message: impl Into<String>) -> Self {
        Self::ChannelError {
            message: message.into(),
        }
    }
}

impl From<FileError> for WatchError {
    fn from(source: FileError) -> Self {
        Self::ReloadFailed { source }
    }
}

/// What caused a reload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReloadTrigger {
    /// [`WatchHandle::reload`](super::WatchHandle::reload) was called.
    Manual,

    /// The file was created.
    FileCreated(PathBuf),

    /// The file was modified.
    FileModified(PathBuf),

    /// The file was deleted.
    FileDeleted(PathBuf),
}

impl Display for ReloadTrigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual reload"),
            Self::FileCreated(path) => write!(f, "file created: {}", path.display()),
            Self::FileModified(path) => write!(f, "file modified: {}", path.display()),
            Self::FileDeleted(path) => write!(f, "file deleted: {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_failed_keeps_file_error() {
        let err = WatchError::from(FileError::NotFound {
            path: "app.json".into(),
        });

        let code = Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("dynaprop::watch::reload_failed"));

        let inner = Diagnostic::diagnostic_source(&err).and_then(|d| d.code().map(|c| c.to_string()));
        assert_eq!(inner.as_deref(), Some("dynaprop::file::not_found"));
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(ReloadTrigger::Manual.to_string(), "manual reload");
        assert_eq!(
            ReloadTrigger::FileModified(PathBuf::from("app.json")).to_string(),
            "file modified: app.json"
        );
    }
}
