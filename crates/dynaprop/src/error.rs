//! Error types for dynamic properties.
//!
//! Every failure the crate reports goes through one of the types below,
//! all of which integrate with [`miette`] for rich terminal diagnostics.
//!
//! | Type | When It Occurs | Who Sees It |
//! |------|----------------|-------------|
//! | [`ValidationError`] | A validator rejected a prospective raw value | Whoever triggered the write |
//! | [`ConversionError`] | A stored raw value could not be parsed as the requested type | That reader only |
//! | [`SourceError`] | A property source failed to produce a value | Logged by the registry |
//!
//! Callback failures are never returned as errors: a panicking change
//! callback is caught and logged, and the remaining callbacks still run.
//!
//! # Absent Versus Malformed
//!
//! A property with no value is not an error. Typed reads of an absent (or
//! empty) property return the caller's default. Only a present value that
//! fails to parse produces a [`ConversionError`]:
//!
//! ```rust
//! use dynaprop::PropertyRegistry;
//!
//! let registry = PropertyRegistry::new();
//! let port = registry.get_or_create("server.port");
//!
//! // No value: the default comes back.
//! assert_eq!(port.get(8080_u16).unwrap(), 8080);
//! ```

use std::error::Error as StdError;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error as ThisError;

/// Boxed error used by converters, validators and sources.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level error type for the crate.
///
/// Each variant wraps a more specific error transparently, so both
/// `Display` and the miette diagnostic come from the inner error.
#[derive(Debug, ThisError, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    /// A validator rejected a value.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// A stored value could not be converted to the requested type.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),

    /// A property source failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    /// A configuration file could not be loaded.
    #[cfg(feature = "file")]
    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] crate::file::FileError),

    /// The file watcher failed.
    #[cfg(feature = "watch")]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Watch(#[from] crate::watch::WatchError),
}

/// A validator rejected a prospective property value.
///
/// When this error is returned from a write, the write did not take effect:
/// the property still holds its previous value.
#[derive(Debug, ThisError, Diagnostic)]
#[error("validation of property '{property}' failed: {message}")]
#[diagnostic(
    code(dynaprop::validation_error),
    help("the new value was rejected; the previous value remains in effect")
)]
pub struct ValidationError {
    /// Name of the property being validated.
    pub property: String,

    /// Human-readable reason for the rejection.
    pub message: String,

    /// Underlying error, if the validator wrapped one.
    #[source]
    pub source: Option<BoxError>,
}

impl ValidationError {
    /// Creates a validation error with a reason.
    ///
    /// The property name is filled in by the property running the validator.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            property: String::new(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a validation error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            property: String::new(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Sets the property name unless one is already present.
    #[must_use]
    pub fn for_property(mut self, property: &str) -> Self {
        if self.property.is_empty() {
            self.property = property.to_string();
        }
        self
    }
}

/// A stored raw value could not be converted to the requested type.
///
/// The failure is cached alongside the property's parsed values, so the same
/// error is returned on every read until the raw value changes. It is `Clone`
/// for that reason.
#[derive(Clone, Debug, ThisError, Diagnostic)]
#[error("failed to convert property '{property}': expected {expected_type}, got {value:?}")]
#[diagnostic(
    code(dynaprop::conversion_error),
    help("update the property source with a value of the expected type")
)]
pub struct ConversionError {
    /// Name of the property that was read.
    pub property: String,

    /// The raw value that failed to convert.
    pub value: String,

    /// Name of the requested type.
    pub expected_type: &'static str,

    /// The underlying parse error.
    #[source]
    pub source: Arc<dyn StdError + Send + Sync>,
}

impl ConversionError {
    /// Creates a conversion error.
    pub fn new(
        property: impl Into<String>,
        value: impl Into<String>,
        expected_type: &'static str,
        source: BoxError,
    ) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            expected_type,
            source: Arc::from(source),
        }
    }
}

/// A property source failed to produce a value.
#[derive(Debug, ThisError, Diagnostic)]
#[error("property source '{source_name}' failed: {message}")]
#[diagnostic(
    code(dynaprop::source_error),
    help("check that the property source is reachable and holds valid data")
)]
pub struct SourceError {
    /// Name of the failing source.
    pub source_name: String,

    /// Human-readable error message.
    pub message: String,

    /// Underlying error, if any.
    #[source]
    pub cause: Option<BoxError>,
}

impl SourceError {
    /// Creates a source error.
    pub fn new(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a source error wrapping an underlying cause.
    pub fn with_cause(
        source_name: impl Into<String>,
        message: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}
