//! Contracts between the registry and external property sources.
//!
//! A [`PropertySource`] is the system of record for raw values. It serves
//! point reads through [`get_string`](PropertySource::get_string) and
//! pushes changes by raising lifecycle events on the
//! [`PropertyEventListener`]s registered with it.
//!
//! # Event Order
//!
//! A well-behaved source raises events around each mutation:
//!
//! ```text
//! add:     on_adding_property   -> (mutate) -> on_property_added
//! update:  on_updating_property -> (mutate) -> on_property_updated
//! remove:  on_removing_property -> (mutate) -> on_property_removed
//! clear:   on_clearing_properties -> (mutate) -> on_properties_cleared
//! reload:  (mutate) -> on_source_loaded
//! ```
//!
//! The "about to" methods return a [`ValidationError`] to veto the mutation.
//! A source must not apply a vetoed mutation, and should hand the error back
//! to whoever requested it.
//!
//! # Implementing a Source
//!
//! ```rust
//! use std::sync::Arc;
//! use dynaprop::{PropertyEventListener, PropertySource, SourceError};
//!
//! struct Fixed;
//!
//! impl PropertySource for Fixed {
//!     fn name(&self) -> &str {
//!         "fixed"
//!     }
//!
//!     fn get_string(&self, name: &str) -> Result<Option<String>, SourceError> {
//!         Ok((name == "greeting").then(|| "hello".to_string()))
//!     }
//!
//!     fn add_listener(&self, _listener: Arc<dyn PropertyEventListener>) {
//!         // A fixed source never changes, so it never raises events.
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::{SourceError, ValidationError};

/// An external store of raw property values.
pub trait PropertySource: Send + Sync {
    /// Identifies the source in events and logs.
    fn name(&self) -> &str;

    /// Returns the current raw value for `name`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the value cannot be read.
    fn get_string(&self, name: &str) -> Result<Option<String>, SourceError>;

    /// Registers a listener for this source's lifecycle events.
    fn add_listener(&self, listener: Arc<dyn PropertyEventListener>);
}

/// Receives a source's lifecycle events.
///
/// Every method gets the source's [`name`](PropertySource::name). Listeners
/// are invoked synchronously on the thread that mutates the source.
pub trait PropertyEventListener: Send + Sync {
    /// The source was (re)loaded and any value may have changed.
    fn on_source_loaded(&self, source: &str);

    /// A value is about to be added.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] to veto the addition.
    fn on_adding_property(
        &self,
        source: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ValidationError>;

    /// A value was added.
    fn on_property_added(&self, source: &str, name: &str, value: Option<&str>);

    /// A value is about to be updated.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] to veto the update.
    fn on_updating_property(
        &self,
        source: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ValidationError>;

    /// A value was updated.
    fn on_property_updated(&self, source: &str, name: &str, value: Option<&str>);

    /// A value is about to be removed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] to veto the removal. The default accepts.
    fn on_removing_property(
        &self,
        source: &str,
        name: &str,
        current: Option<&str>,
    ) -> Result<(), ValidationError> {
        let _ = (source, name, current);
        Ok(())
    }

    /// A value was removed.
    fn on_property_removed(&self, source: &str, name: &str);

    /// All values are about to be cleared.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] to veto the clear. The default accepts.
    fn on_clearing_properties(&self, source: &str) -> Result<(), ValidationError> {
        let _ = source;
        Ok(())
    }

    /// All values were cleared.
    fn on_properties_cleared(&self, source: &str);
}
