//! File format detection.
//!
//! | Format | Feature | Extensions |
//! |--------|---------|------------|
//! | JSON | `file` (always) | `.json` |
//! | TOML | `toml` | `.toml` |
//! | YAML | `yaml` | `.yaml`, `.yml` |

use std::path::Path;

/// Supported property file formats.
///
/// # Example
///
/// ```rust
/// use dynaprop::file::FileFormat;
/// use std::path::Path;
///
/// assert_eq!(FileFormat::from_path(Path::new("app.json")), Some(FileFormat::Json));
/// assert_eq!(FileFormat::from_path(Path::new("app.txt")), None);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileFormat {
    /// JSON format (`.json` extension).
    Json,

    /// TOML format (`.toml` extension).
    ///
    /// Requires the `toml` feature flag.
    #[cfg(feature = "toml")]
    Toml,

    /// YAML format (`.yaml` or `.yml` extension).
    ///
    /// Requires the `yaml` feature flag.
    #[cfg(feature = "yaml")]
    Yaml,
}

impl FileFormat {
    /// Detects the format from the file extension, case-insensitively.
    ///
    /// Returns `None` if the extension is not recognized or its feature is
    /// not enabled.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;

        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),

            #[cfg(feature = "toml")]
            "toml" => Some(Self::Toml),

            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Some(Self::Yaml),

            _ => None,
        }
    }

    /// Format name for error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",

            #[cfg(feature = "toml")]
            Self::Toml => "TOML",

            #[cfg(feature = "yaml")]
            Self::Yaml => "YAML",
        }
    }
}
