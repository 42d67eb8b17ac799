//! A property source backed by one file.

use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::FileError;
use super::format::FileFormat;
use super::parse;
use crate::memory::{MemorySource, ReloadSummary};
use crate::{PropertyEventListener, PropertySource, SourceError};

/// Serves the flattened contents of a JSON, TOML or YAML file.
///
/// The file is read once on [`open`](Self::open). [`reload`](Self::reload)
/// re-reads it and raises add, update and remove events for the keys that
/// changed, so bound registries can validate and apply each of them.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dynaprop::PropertyRegistry;
/// use dynaprop::file::FileSource;
///
/// # fn main() -> Result<(), dynaprop::file::FileError> {
/// let source = Arc::new(FileSource::open("app.json")?);
/// let registry = PropertyRegistry::builder().source(source.clone()).build();
///
/// let port = registry.typed("server.port", 8080_u16);
///
/// // Later, after the file was edited:
/// let summary = source.reload()?;
/// println!("{} properties changed", summary.changed());
/// # Ok(())
/// # }
/// ```
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    values: MemorySource,
}

impl FileSource {
    /// Opens and parses the file at `path`, detecting the format from its
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file is missing, unreadable, of an
    /// unknown format or malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();

        let format = FileFormat::from_path(path).ok_or_else(|| FileError::UnknownFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        })?;

        Self::open_as(path, format)
    }

    /// Opens and parses the file at `path` as `format`.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file is missing, unreadable or malformed.
    pub fn open_as(path: impl AsRef<Path>, format: FileFormat) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        let values = parse::read_file(&path, format)?;

        tracing::debug!(
            path = %path.display(),
            format = format.name(),
            values = values.len(),
            "opened property file"
        );

        Ok(Self {
            values: MemorySource::with_values(path.display().to_string(), values),
            path,
            format,
        })
    }

    /// The watched file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file format.
    #[must_use]
    pub const fn format(&self) -> FileFormat {
        self.format
    }

    /// The current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key)
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values.keys()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the file holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Re-reads the file and applies the differences.
    ///
    /// Changes vetoed by a validator are listed in
    /// [`ReloadSummary::rejected`] and keep their previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file can no longer be read or parsed.
    /// The source then keeps serving the previous contents.
    pub fn reload(&self) -> Result<ReloadSummary, FileError> {
        let values = parse::read_file(&self.path, self.format)?;
        let summary = self.values.apply(values);

        if !summary.rejected.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                rejected = summary.rejected.len(),
                "some property changes were rejected"
            );
        }

        Ok(summary)
    }
}

impl PropertySource for FileSource {
    fn name(&self) -> &str {
        self.values.name()
    }

    fn get_string(&self, name: &str) -> Result<Option<String>, SourceError> {
        self.values.get_string(name)
    }

    fn add_listener(&self, listener: Arc<dyn PropertyEventListener>) {
        self.values.add_listener(listener);
    }
}

impl Debug for FileSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("values", &self.values.len())
            .finish()
    }
}
