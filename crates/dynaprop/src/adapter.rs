//! Translates source lifecycle events into registry operations.
//!
//! | Event                   | Action                                           |
//! |-------------------------|--------------------------------------------------|
//! | source loaded           | refresh every property from the source           |
//! | adding / updating       | validate against the property, if it exists      |
//! | added / updated         | get or create the property, commit, notify       |
//! | removing                | accepted without validation                      |
//! | removed                 | commit absent to the property, if it exists      |
//! | clearing                | accepted                                         |
//! | cleared                 | refresh every property from the source           |
//!
//! The listener holds the registry weakly and remembers the binding
//! generation it was created for. Once the registry is dropped, reset or
//! bound to another source, every event is ignored.

use std::sync::Weak;

use crate::registry::RegistryInner;
use crate::{PropertyEventListener, PropertyRegistry, ValidationError};

/// Listener a [`PropertyRegistry`] attaches to its bound source.
pub(crate) struct RegistryListener {
    registry: Weak<RegistryInner>,
    generation: u64,
}

impl RegistryListener {
    pub(crate) const fn new(registry: Weak<RegistryInner>, generation: u64) -> Self {
        Self {
            registry,
            generation,
        }
    }

    /// The registry, if it still exists and is still bound to this listener.
    fn registry(&self, source: &str) -> Option<PropertyRegistry> {
        let inner = self.registry.upgrade()?;

        if inner.generation() != self.generation {
            tracing::trace!(
                source = %source,
                listener = self.generation,
                current = inner.generation(),
                "ignoring event from unbound source"
            );
            return None;
        }

        Some(PropertyRegistry::from_inner(inner))
    }

    fn validate(&self, source: &str, name: &str, value: Option<&str>) -> Result<(), ValidationError> {
        let Some(registry) = self.registry(source) else {
            return Ok(());
        };

        registry.validate_property(name, value).inspect_err(|err| {
            tracing::warn!(
                source = %source,
                property = %name,
                error = %err,
                "rejected property change"
            );
        })
    }

    fn commit(&self, source: &str, name: &str, value: Option<&str>) {
        if let Some(registry) = self.registry(source) {
            registry.update_property(name, value);
        }
    }

    fn refresh(&self, source: &str) {
        if let Some(registry) = self.registry(source) {
            registry.refresh_all();
        }
    }
}

impl PropertyEventListener for RegistryListener {
    fn on_source_loaded(&self, source: &str) {
        tracing::debug!(source = %source, "source loaded");
        self.refresh(source);
    }

    fn on_adding_property(
        &self,
        source: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ValidationError> {
        self.validate(source, name, value)
    }

    fn on_property_added(&self, source: &str, name: &str, value: Option<&str>) {
        self.commit(source, name, value);
    }

    fn on_updating_property(
        &self,
        source: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ValidationError> {
        self.validate(source, name, value)
    }

    fn on_property_updated(&self, source: &str, name: &str, value: Option<&str>) {
        self.commit(source, name, value);
    }

    fn on_property_removed(&self, source: &str, name: &str) {
        let Some(registry) = self.registry(source) else {
            return;
        };

        if let Some(property) = registry.get(name) {
            property.update(None);
        }
    }

    fn on_properties_cleared(&self, source: &str) {
        tracing::debug!(source = %source, "source cleared");
        self.refresh(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_events_after_registry_drop_are_ignored() {
        let registry = PropertyRegistry::new();
        let listener = RegistryListener::new(Arc::downgrade(&registry.inner_for_tests()), 0);
        drop(registry);

        listener.on_property_added("src", "prop1", Some("v"));
        assert!(listener.on_adding_property("src", "prop1", Some("v")).is_ok());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let registry = PropertyRegistry::new();
        let listener = RegistryListener::new(Arc::downgrade(&registry.inner_for_tests()), 7);

        listener.on_property_added("src", "prop1", Some("v"));
        assert!(registry.get("prop1").is_none());
    }

    #[test]
    fn test_current_generation_commits() {
        let registry = PropertyRegistry::new();
        let listener = RegistryListener::new(Arc::downgrade(&registry.inner_for_tests()), 0);

        listener.on_property_added("src", "prop1", Some("v"));
        assert_eq!(
            registry.get("prop1").and_then(|p| p.raw_value()).as_deref(),
            Some("v")
        );

        listener.on_property_removed("src", "prop1");
        assert_eq!(registry.get("prop1").and_then(|p| p.raw_value()), None);
    }
}
