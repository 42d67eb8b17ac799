//! The property registry: one [`Property`] per name, bound to at most one
//! [`PropertySource`].
//!
//! A registry is an explicit, cheaply cloneable handle. Clones share the
//! same properties, so it can be passed to every consumer that needs
//! properties, and independent registries can coexist (e.g. one per test).
//!
//! # Lifecycle
//!
//! ```text
//! PropertyRegistry::new()  ──▶  bind_source(src)  ──▶  events flow  ──▶  reset()
//!                                  │                                      │
//!                                  └── initial refresh_all() ◀────────────┘ (bind again)
//! ```
//!
//! Binding a new source replaces the previous binding. The previous source
//! keeps its listener, but that listener belongs to an older binding
//! generation and ignores every event it receives from then on.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::adapter::RegistryListener;
use crate::typed::{StringProperty, TypedProperty};
use crate::{Clock, FromRawValue, Property, PropertySource, SystemClock, ValidationError};

struct Binding {
    source: Arc<dyn PropertySource>,
    generation: u64,
}

pub(crate) struct RegistryInner {
    properties: DashMap<String, Arc<Property>>,
    binding: RwLock<Option<Binding>>,
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl RegistryInner {
    /// The current binding generation.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Concurrency-safe mapping from property name to [`Property`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dynaprop::{MemorySource, PropertyRegistry};
///
/// let source = Arc::new(MemorySource::new("app"));
/// source.set("feature.enabled", "true").unwrap();
///
/// let registry = PropertyRegistry::builder().source(source.clone()).build();
/// let enabled = registry.get_or_create("feature.enabled");
/// assert!(enabled.get(false).unwrap());
///
/// source.set("feature.enabled", "false").unwrap();
/// assert!(!enabled.get(true).unwrap());
/// ```
#[derive(Clone)]
pub struct PropertyRegistry {
    inner: Arc<RegistryInner>,
}

impl PropertyRegistry {
    /// Creates an empty registry with the system clock and no source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty registry that timestamps changes with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                properties: DashMap::new(),
                binding: RwLock::new(None),
                generation: AtomicU64::new(0),
                clock,
            }),
        }
    }

    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) const fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    #[cfg(test)]
    pub(crate) fn inner_for_tests(&self) -> Arc<RegistryInner> {
        self.inner.clone()
    }

    /// The clock used to timestamp changes.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Returns the property for `name`, creating it if needed.
    ///
    /// Concurrent first-time calls for the same name all get the same
    /// instance. A newly created property starts absent; if a source is
    /// bound, it pulls its current value from the source before any other
    /// caller can see it.
    pub fn get_or_create(&self, name: &str) -> Arc<Property> {
        if let Some(existing) = self.inner.properties.get(name) {
            return existing.value().clone();
        }

        // Synced before publishing, so no event can be overwritten by a
        // stale initial read. A racing creator's instance may win instead.
        let candidate = Arc::new(Property::new(name, self.inner.clock.clone()));
        if let Some(source) = self.source() {
            self.sync_from(&candidate, source.as_ref());
        }

        self.inner
            .properties
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::trace!(property = %name, "created property");
                candidate
            })
            .value()
            .clone()
    }

    /// Returns the property for `name` if it exists, without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Property>> {
        self.inner
            .properties
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.properties.len()
    }

    /// Returns `true` if no property has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.properties.is_empty()
    }

    /// Names of all properties, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner
            .properties
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// The bound source, if any.
    #[must_use]
    pub fn source(&self) -> Option<Arc<dyn PropertySource>> {
        self.inner
            .binding
            .read()
            .as_ref()
            .map(|binding| binding.source.clone())
    }

    /// Binds `source`, replacing any previous binding, and re-syncs every
    /// property from it.
    ///
    /// Returns the number of properties whose value changed.
    pub fn bind_source(&self, source: Arc<dyn PropertySource>) -> usize {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

        *self.inner.binding.write() = Some(Binding {
            source: source.clone(),
            generation,
        });

        let listener = RegistryListener::new(Arc::downgrade(&self.inner), generation);
        source.add_listener(Arc::new(listener));

        tracing::debug!(source = %source.name(), generation, "bound property source");
        self.refresh_all()
    }

    /// Drops the source binding and every property.
    ///
    /// Properties handed out earlier keep working but are no longer updated.
    /// Intended for re-initialization and tests.
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        *self.inner.binding.write() = None;
        self.inner.properties.clear();
        tracing::debug!("registry reset");
    }

    /// Pulls every property's value from the bound source and applies it.
    ///
    /// Each property that changed notifies its callbacks right after its own
    /// commit. A property whose read fails is logged and left unchanged.
    /// Returns the number of properties that changed; `0` without a source.
    pub fn refresh_all(&self) -> usize {
        let Some(source) = self.source() else {
            return 0;
        };

        // Snapshot first so no map shard stays locked while callbacks run.
        let properties: Vec<Arc<Property>> = self
            .inner
            .properties
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let changed = properties
            .iter()
            .filter(|property| self.sync_from(property, source.as_ref()))
            .count();

        tracing::debug!(
            source = %source.name(),
            properties = properties.len(),
            changed,
            "refreshed properties"
        );
        changed
    }

    /// Runs the validators of `name` against `value`, if the property exists.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`].
    pub fn validate_property(&self, name: &str, value: Option<&str>) -> Result<(), ValidationError> {
        self.get(name)
            .map_or(Ok(()), |property| property.validate(value))
    }

    /// Commits `value` to `name` (creating the property) and notifies on change.
    pub fn update_property(&self, name: &str, value: Option<&str>) -> bool {
        self.get_or_create(name).update(value)
    }

    /// Typed view of `name` with a default.
    pub fn typed<T: FromRawValue>(&self, name: &str, default: T) -> TypedProperty<T> {
        TypedProperty::new(self.get_or_create(name), default)
    }

    /// String view of `name` with an optional default.
    pub fn string(&self, name: &str, default: Option<&str>) -> StringProperty {
        TypedProperty::new(self.get_or_create(name), default.map(str::to_string))
    }

    fn sync_from(&self, property: &Property, source: &dyn PropertySource) -> bool {
        match source.get_string(property.name()) {
            Ok(value) => property.update(value.as_deref()),

            Err(err) => {
                tracing::warn!(
                    property = %property.name(),
                    source = %source.name(),
                    error = %err,
                    "unable to update property"
                );
                false
            }
        }
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for PropertyRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let binding = self.inner.binding.read();
        f.debug_struct("PropertyRegistry")
            .field("properties", &self.inner.properties.len())
            .field("source", &binding.as_ref().map(|b| b.source.name().to_string()))
            .field("generation", &binding.as_ref().map(|b| b.generation))
            .finish()
    }
}

/// Builder for [`PropertyRegistry`].
///
/// ```rust
/// use std::sync::Arc;
/// use dynaprop::{ManualClock, MemorySource, PropertyRegistry};
///
/// let registry = PropertyRegistry::builder()
///     .clock(Arc::new(ManualClock::default()))
///     .source(Arc::new(MemorySource::new("defaults")))
///     .build();
///
/// assert!(registry.source().is_some());
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    clock: Option<Arc<dyn Clock>>,
    source: Option<Arc<dyn PropertySource>>,
}

impl RegistryBuilder {
    /// Creates a builder with the system clock and no source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock used to timestamp changes.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the source to bind on [`build`](Self::build).
    #[must_use]
    pub fn source(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates the registry and binds the source, if one was given.
    #[must_use]
    pub fn build(self) -> PropertyRegistry {
        let registry = PropertyRegistry::with_clock(self.clock.unwrap_or_else(|| Arc::new(SystemClock)));

        if let Some(source) = self.source {
            registry.bind_source(source);
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, MemorySource};
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = PropertyRegistry::new();
        let a = registry.get_or_create("prop1");
        let b = registry.get_or_create("prop1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let registry = PropertyRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_without_source_changes_nothing() {
        let registry = PropertyRegistry::new();
        registry.get_or_create("prop1");
        assert_eq!(registry.refresh_all(), 0);
    }

    #[test]
    fn test_new_property_syncs_from_bound_source() {
        let clock = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(42),
        ));
        let source = Arc::new(MemorySource::new("test"));
        source.set("prop1", "value1").unwrap();

        let registry = PropertyRegistry::builder()
            .clock(clock.clone())
            .source(source)
            .build();

        let prop = registry.get_or_create("prop1");
        assert_eq!(prop.get_string(None).as_deref(), Some("value1"));
        assert_eq!(prop.updated_at(), clock.now());
    }

    #[test]
    fn test_reset_clears_everything() {
        let registry = PropertyRegistry::new();
        registry.bind_source(Arc::new(MemorySource::new("test")));
        let before = registry.get_or_create("prop1");

        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.source().is_none());

        let after = registry.get_or_create("prop1");
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_rebinding_ignores_previous_source() {
        let registry = PropertyRegistry::new();
        let first = Arc::new(MemorySource::new("first"));
        let second = Arc::new(MemorySource::new("second"));

        registry.bind_source(first.clone());
        registry.bind_source(second.clone());
        let prop = registry.get_or_create("prop1");

        first.set("prop1", "stale").unwrap();
        assert_eq!(prop.raw_value(), None);

        second.set("prop1", "fresh").unwrap();
        assert_eq!(prop.raw_value().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_validate_property_ignores_unknown_names() {
        let registry = PropertyRegistry::new();
        assert!(registry.validate_property("nobody", Some("x")).is_ok());
    }
}
