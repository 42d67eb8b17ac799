//! File-backed property sources.
//!
//! Enabled with the `file` feature flag.
//!
//! # Supported Formats
//!
//! | Format | Feature Flag | Extensions |
//! |--------|--------------|------------|
//! | JSON | `file` (always) | `.json` |
//! | TOML | `toml` | `.toml` |
//! | YAML | `yaml` | `.yaml`, `.yml` |
//!
//! # Property Names
//!
//! Nested tables are flattened into dotted names. Given
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! ports = [80, 443]
//! ```
//!
//! the source serves `server.host = "0.0.0.0"` and `server.ports = "80,443"`.
//!
//! # Error Handling
//!
//! Parse errors include source location information when available,
//! enabling rich diagnostic output via [`miette`]:
//!
//! ```text
//! Error: JSON parse error in app.json
//!    ╭─[app.json:3:10]
//!    │
//!  3 │   "host" "x"
//!    │          ^^^ expected `:` at line 3 column 10
//!    ╰────
//!   help: check for missing commas, quotes, or brackets
//! ```

// FileError is large to carry miette source spans
#![allow(clippy::result_large_err)]

mod error;
mod format;
mod parse;
mod source;

pub use error::FileError;
pub use format::FileFormat;
pub use source::FileSource;

pub use crate::memory::ReloadSummary;
