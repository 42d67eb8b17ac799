//! Process environment as a property source.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{PropertyEventListener, PropertySource, SourceError};

/// Source that reads properties from environment variables.
///
/// Every read goes to the process environment, so the registry sees new
/// values as soon as something calls [`reload`](Self::reload).
///
/// # Example
///
/// ```rust
/// use dynaprop::EnvSource;
///
/// // Without prefix
/// let source = EnvSource::new();
///
/// // With prefix (reads APP_DATABASE_URL for property "DATABASE_URL")
/// let source = EnvSource::with_prefix("APP_");
/// ```
pub struct EnvSource {
    prefix: Option<String>,
    listeners: ArcSwap<Vec<Arc<dyn PropertyEventListener>>>,
}

impl EnvSource {
    /// Creates an environment source without a prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: None,
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Creates an environment source with a prefix.
    ///
    /// With prefix `"APP_"`, property `"PORT"` is read from `"APP_PORT"`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Announces that the environment may have changed.
    ///
    /// Bound registries re-read every property.
    pub fn reload(&self) {
        tracing::debug!(source = %self.name(), "reloading environment");
        for listener in self.listeners.load_full().iter() {
            listener.on_source_loaded(self.name());
        }
    }

    /// Returns the variable name with prefix applied.
    fn full_key(&self, key: &str) -> String {
        self.prefix
            .as_ref()
            .map_or_else(|| key.to_string(), |p| format!("{p}{key}"))
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get_string(&self, name: &str) -> Result<Option<String>, SourceError> {
        let full_key = self.full_key(name);

        match std::env::var(&full_key) {
            Ok(value) => Ok(Some(value)),

            Err(std::env::VarError::NotPresent) => Ok(None),

            Err(std::env::VarError::NotUnicode(_)) => Err(SourceError::new(
                self.name(),
                format!("environment variable '{full_key}' contains invalid UTF-8"),
            )),
        }
    }

    fn add_listener(&self, listener: Arc<dyn PropertyEventListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(listener.clone());
            next
        });
    }
}

impl Debug for EnvSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource")
            .field("prefix", &self.prefix)
            .field("listeners", &self.listeners.load().len())
            .finish()
    }
}
