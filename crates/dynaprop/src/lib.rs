//! # dynaprop
//!
//! Dynamic, externally updated properties for long-running Rust services.
//!
//! Application code asks a [`PropertyRegistry`] for a named property once,
//! keeps the returned handle, and reads it whenever it needs the value. The
//! value lives in an external [`PropertySource`]; when the source changes,
//! the registry applies the change to the property, flushes its parse cache
//! and runs its change callbacks. Validators attached to a property can veto
//! a change before the source commits it.
//!
//! ## Features
//!
//! - **One instance per name** - concurrent callers always share the same property
//! - **Typed reads with defaults** - values are parsed at most once per change
//! - **Change callbacks** - run after every committed change, panics are isolated
//! - **Validation** - vetoes reach back into the source before it mutates
//! - **Pluggable sources** - in-memory, environment and file-backed sources included
//! - **Hot reload** - watch a property file and apply its changes as events
//! - **Rich diagnostics** - every error type integrates with [`miette`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dynaprop::{MemorySource, PropertyRegistry};
//!
//! let source = Arc::new(MemorySource::new("overrides"));
//! let registry = PropertyRegistry::builder().source(source.clone()).build();
//!
//! let timeout = registry.typed("http.timeout.ms", 500_u64);
//! timeout.add_callback(|| println!("timeout changed"));
//!
//! assert_eq!(timeout.value().unwrap(), 500);
//!
//! source.set("http.timeout.ms", "1500").unwrap();
//! assert_eq!(timeout.value().unwrap(), 1500);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `file` | JSON file source | No |
//! | `toml` | TOML file parsing (implies `file`) | No |
//! | `yaml` | YAML file parsing (implies `file`) | No |
//! | `json` | Alias for `file` | No |
//! | `file-all` | All file formats (toml + yaml + json) | **Yes** |
//! | `watch` | Hot reload with file watching | No |
//! | `full` | Enable all features | No |
//!
//! ## Error Handling
//!
//! All errors can be reported through the [`Error`] type, which integrates
//! with [`miette`] for rich terminal diagnostics:
//!
//! ```rust
//! use dynaprop::{PropertyRegistry, Error};
//!
//! let registry = PropertyRegistry::new();
//! let port = registry.get_or_create("server.port");
//! port.update(Some("eighty"));
//!
//! if let Err(e) = port.get(8080_u16) {
//!     // Pretty-print with miette for detailed output
//!     eprintln!("{:?}", dynaprop::miette::Report::from(Error::from(e)));
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//! Commits are logged at `debug`, rejected changes and failing sources at
//! `warn`, and panicking callbacks at `error`.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Re-export miette for error handling.
/// Users can use `dynaprop::miette` instead of adding miette as a dependency.
pub use miette;

// ============================================================================
// Core
// ============================================================================

mod adapter;
mod cache;
mod clock;
mod convert;
mod error;
mod property;
mod registry;
mod source;
mod typed;
mod validation;

pub use cache::PropertyCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use convert::{FromRawValue, convert};
pub use error::{BoxError, ConversionError, Error, SourceError, ValidationError};
pub use property::{Callback, CallbackId, Commit, Property};
pub use registry::{PropertyRegistry, RegistryBuilder};
pub use source::{PropertyEventListener, PropertySource};
pub use typed::{StringProperty, TypedProperty};
pub use validation::{ParsesAs, Validator, ValidatorFn};

/// Result type alias using the crate's [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ============================================================================
// Sources
// ============================================================================

pub mod env;
pub mod memory;

pub use env::EnvSource;
pub use memory::{MemorySource, ReloadSummary};

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "file")]
pub use file::{FileError, FileFormat, FileSource};

// ============================================================================
// Hot Reload
// ============================================================================

#[cfg(feature = "watch")]
pub mod watch;

#[cfg(feature = "watch")]
pub use watch::{WatchBuilder, WatchError, WatchHandle};
