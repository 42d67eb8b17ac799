//! File source errors with rich diagnostics.

use miette::{Diagnostic, NamedSource, SourceSpan};

/// Error raised while opening or reloading a [`FileSource`](super::FileSource).
///
/// Parse errors carry the file content and a span, so [`miette`] can point at
/// the offending location:
///
/// ```text
/// Error: TOML parse error in app.toml
///    ╭─[app.toml:5:12]
///    │
///  5 │ port = 80 80
///    │           ^^ expected newline
///    ╰────
///   help: check for missing quotes, invalid values, or syntax errors
/// ```
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum FileError {
    /// Property file not found
    #[error("property file not found: {path}")]
    #[diagnostic(
        code(dynaprop::file::not_found),
        help("ensure the file exists at the specified path")
    )]
    NotFound {
        /// Path to the missing file
        path: String,
    },

    /// Failed to read file
    #[error("failed to read property file: {path}")]
    #[diagnostic(
        code(dynaprop::file::read_error),
        help("check file permissions and ensure it's readable")
    )]
    ReadError {
        /// Path to the file
        path: String,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Unknown file format
    #[error("unknown property file format: .{extension}")]
    #[diagnostic(
        code(dynaprop::file::unknown_format),
        help("supported formats: .json, .toml, .yaml, .yml")
    )]
    UnknownFormat {
        /// The file extension that wasn't recognized
        extension: String,
    },

    /// Parse error with source location
    #[error("{format} parse error in {path}")]
    #[diagnostic(code(dynaprop::file::parse_error))]
    Parse {
        /// Format name (JSON, TOML, YAML)
        format: &'static str,

        /// Path to the file
        path: String,

        /// The source file content for display
        #[source_code]
        src: NamedSource<String>,

        /// The location of the error
        #[label("{message}")]
        span: SourceSpan,

        /// Description of what went wrong
        message: String,

        /// Suggestion for how to fix
        #[help]
        help: String,
    },

    /// Parse error without source location
    #[error("{format} parse error: {message}")]
    #[diagnostic(code(dynaprop::file::parse_error))]
    ParseNoSpan {
        /// Format name
        format: &'static str,

        /// Description of what went wrong
        message: String,

        /// Suggestion for how to fix
        #[help]
        help: String,
    },

    /// The document root is not a table of properties
    #[error("property file {path} must contain a table at the top level, found {found}")]
    #[diagnostic(
        code(dynaprop::file::invalid_root),
        help("wrap the values in an object (JSON), a table (TOML) or a mapping (YAML)")
    )]
    InvalidRoot {
        /// Path to the file
        path: String,

        /// Kind of value found at the root
        found: &'static str,
    },
}
