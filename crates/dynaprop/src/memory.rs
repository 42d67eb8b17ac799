//! In-memory property source.
//!
//! [`MemorySource`] is a string map that raises the full set of lifecycle
//! events around each mutation, so a bound registry sees every change and
//! can veto adds and updates through its validators.
//!
//! # Locking
//!
//! Writers are serialized by a [`ReentrantMutex`]: a callback that runs as a
//! consequence of a write may write to the same source again on the same
//! thread. The map itself sits behind a separate [`RwLock`] that is only held
//! for the actual read or mutation, never while listeners run, so listeners
//! are free to read the source.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{ReentrantMutex, RwLock};

use crate::{PropertyEventListener, PropertySource, SourceError, ValidationError};

/// Outcome of diffing a full set of values into a source.
#[derive(Debug, Default)]
pub struct ReloadSummary {
    /// Keys that were added.
    pub added: Vec<String>,

    /// Keys whose value changed.
    pub updated: Vec<String>,

    /// Keys that were removed.
    pub removed: Vec<String>,

    /// Changes vetoed by a listener. The old value, if any, was kept.
    pub rejected: Vec<ValidationError>,
}

impl ReloadSummary {
    /// Number of keys that were actually changed.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Returns `true` if nothing changed and nothing was rejected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed() == 0 && self.rejected.is_empty()
    }
}

/// A mutable, event-raising property source held in memory.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dynaprop::{MemorySource, PropertyRegistry, ValidationError, ValidatorFn};
///
/// let source = Arc::new(MemorySource::new("overrides"));
/// let registry = PropertyRegistry::builder().source(source.clone()).build();
///
/// let level = registry.get_or_create("log.level");
/// level.add_validator(ValidatorFn::new(|value| match value {
///     Some("debug" | "info" | "warn" | "error") | None => Ok(()),
///     Some(other) => Err(ValidationError::new(format!("unknown level '{other}'"))),
/// }));
///
/// source.set("log.level", "info").unwrap();
/// assert!(source.set("log.level", "loud").is_err());
///
/// assert_eq!(source.get("log.level").as_deref(), Some("info"));
/// assert_eq!(level.get_string(None).as_deref(), Some("info"));
/// ```
pub struct MemorySource {
    name: String,
    values: RwLock<HashMap<String, String>>,
    writer: ReentrantMutex<()>,
    listeners: ArcSwap<Vec<Arc<dyn PropertyEventListener>>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_values(name, HashMap::<String, String>::new())
    }

    /// Creates a source pre-filled with `values`. No events are raised.
    pub fn with_values<I, K, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            writer: ReentrantMutex::new(()),
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// The current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Returns `true` if `key` has a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if the source holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// A copy of every key and value.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values.read().clone()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    /// Sets `key` to `value`, raising the updating and updated events.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the
    /// change. The source is left untouched.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ValidationError> {
        let _writer = self.writer.lock();
        self.write_update(key, value)
    }

    /// Adds `key` if it has no value yet, raising the adding and added events.
    ///
    /// Returns `Ok(false)` without raising anything if `key` already exists.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the add.
    pub fn try_add(&self, key: &str, value: &str) -> Result<bool, ValidationError> {
        let _writer = self.writer.lock();

        if self.contains_key(key) {
            return Ok(false);
        }

        self.write_add(key, value)?;
        Ok(true)
    }

    /// Returns the value of `key`, adding `value` first if it has none.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the add.
    pub fn get_or_add(&self, key: &str, value: &str) -> Result<String, ValidationError> {
        let _writer = self.writer.lock();

        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }

        self.write_add(key, value)?;
        Ok(value.to_string())
    }

    /// Adds `key` with `value`, or replaces its value with `update(key, old)`.
    ///
    /// Returns the value that was written.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the write.
    pub fn add_or_update<F>(&self, key: &str, value: &str, update: F) -> Result<String, ValidationError>
    where
        F: FnOnce(&str, &str) -> String,
    {
        let _writer = self.writer.lock();

        match self.get(key) {
            Some(old) => {
                let updated = update(key, &old);
                self.write_update(key, &updated)?;
                Ok(updated)
            }

            None => {
                self.write_add(key, value)?;
                Ok(value.to_string())
            }
        }
    }

    /// Sets `key` to `value` only if its current value equals `comparison`.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the update.
    pub fn try_update(&self, key: &str, value: &str, comparison: &str) -> Result<bool, ValidationError> {
        let _writer = self.writer.lock();

        if self.get(key).as_deref() != Some(comparison) {
            return Ok(false);
        }

        self.write_update(key, value)?;
        Ok(true)
    }

    /// Removes `key`, raising the removing and removed events.
    ///
    /// Returns the removed value, `None` without raising anything if absent.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the removal.
    pub fn remove(&self, key: &str) -> Result<Option<String>, ValidationError> {
        let _writer = self.writer.lock();
        self.write_remove(key)
    }

    /// Removes every value, raising the clearing and cleared events.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first listener that vetoed the clear.
    pub fn clear(&self) -> Result<(), ValidationError> {
        let _writer = self.writer.lock();

        self.before(|l| l.on_clearing_properties(&self.name))?;
        self.values.write().clear();
        tracing::debug!(source = %self.name, "cleared values");
        self.after(|l| l.on_properties_cleared(&self.name));

        Ok(())
    }

    /// Replaces every value without per-key events, then raises source-loaded.
    pub fn load<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let _writer = self.writer.lock();

        let values: HashMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let count = values.len();
        *self.values.write() = values;

        tracing::debug!(source = %self.name, values = count, "loaded values");
        self.after(|l| l.on_source_loaded(&self.name));
    }

    /// Makes the source hold exactly `values`, raising per-key events.
    ///
    /// Keys missing from `values` are removed, new keys are added and changed
    /// keys are updated, in key order. A vetoed change is recorded in the
    /// summary and skipped; the remaining keys are still applied.
    pub fn apply<I, K, V>(&self, values: I) -> ReloadSummary
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let _writer = self.writer.lock();

        let target: BTreeMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let current = self.snapshot();
        let mut summary = ReloadSummary::default();

        let mut stale: Vec<&String> = current.keys().filter(|k| !target.contains_key(*k)).collect();
        stale.sort_unstable();

        for key in stale {
            match self.write_remove(key) {
                Ok(_) => summary.removed.push(key.clone()),
                Err(err) => summary.rejected.push(err),
            }
        }

        for (key, value) in &target {
            let outcome = match current.get(key) {
                None => self.write_add(key, value).map(|()| &mut summary.added),
                Some(old) if old != value => self.write_update(key, value).map(|()| &mut summary.updated),
                Some(_) => continue,
            };

            match outcome {
                Ok(bucket) => bucket.push(key.clone()),
                Err(err) => summary.rejected.push(err),
            }
        }

        tracing::debug!(
            source = %self.name,
            added = summary.added.len(),
            updated = summary.updated.len(),
            removed = summary.removed.len(),
            rejected = summary.rejected.len(),
            "applied values"
        );
        summary
    }

    fn write_add(&self, key: &str, value: &str) -> Result<(), ValidationError> {
        self.before(|l| l.on_adding_property(&self.name, key, Some(value)))?;
        self.values.write().insert(key.to_string(), value.to_string());
        tracing::trace!(source = %self.name, key = %key, "added value");
        self.after(|l| l.on_property_added(&self.name, key, Some(value)));
        Ok(())
    }

    fn write_update(&self, key: &str, value: &str) -> Result<(), ValidationError> {
        self.before(|l| l.on_updating_property(&self.name, key, Some(value)))?;
        self.values.write().insert(key.to_string(), value.to_string());
        tracing::trace!(source = %self.name, key = %key, "updated value");
        self.after(|l| l.on_property_updated(&self.name, key, Some(value)));
        Ok(())
    }

    fn write_remove(&self, key: &str) -> Result<Option<String>, ValidationError> {
        let Some(current) = self.get(key) else {
            return Ok(None);
        };

        self.before(|l| l.on_removing_property(&self.name, key, Some(&current)))?;
        let removed = self.values.write().remove(key);
        tracing::trace!(source = %self.name, key = %key, "removed value");
        self.after(|l| l.on_property_removed(&self.name, key));
        Ok(removed)
    }

    fn before<F>(&self, event: F) -> Result<(), ValidationError>
    where
        F: Fn(&dyn PropertyEventListener) -> Result<(), ValidationError>,
    {
        let listeners = self.listeners.load_full();
        listeners.iter().try_for_each(|listener| event(listener.as_ref()))
    }

    fn after<F>(&self, event: F)
    where
        F: Fn(&dyn PropertyEventListener),
    {
        let listeners = self.listeners.load_full();
        for listener in listeners.iter() {
            event(listener.as_ref());
        }
    }
}

impl PropertySource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_string(&self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.get(name))
    }

    fn add_listener(&self, listener: Arc<dyn PropertyEventListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(listener.clone());
            next
        });
    }
}

impl Debug for MemorySource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .field("values", &self.len())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every event and optionally vetoes one key.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        veto: Option<&'static str>,
    }

    impl Recorder {
        fn vetoing(key: &'static str) -> Self {
            Self {
                veto: Some(key),
                ..Self::default()
            }
        }

        fn record(&self, event: String) {
            self.events.lock().push(event);
        }

        fn check(&self, name: &str) -> Result<(), ValidationError> {
            if self.veto == Some(name) {
                Err(ValidationError::new("vetoed").for_property(name))
            } else {
                Ok(())
            }
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl PropertyEventListener for Recorder {
        fn on_source_loaded(&self, _: &str) {
            self.record("loaded".into());
        }

        fn on_adding_property(&self, _: &str, name: &str, _: Option<&str>) -> Result<(), ValidationError> {
            self.record(format!("adding {name}"));
            self.check(name)
        }

        fn on_property_added(&self, _: &str, name: &str, _: Option<&str>) {
            self.record(format!("added {name}"));
        }

        fn on_updating_property(&self, _: &str, name: &str, _: Option<&str>) -> Result<(), ValidationError> {
            self.record(format!("updating {name}"));
            self.check(name)
        }

        fn on_property_updated(&self, _: &str, name: &str, _: Option<&str>) {
            self.record(format!("updated {name}"));
        }

        fn on_removing_property(&self, _: &str, name: &str, _: Option<&str>) -> Result<(), ValidationError> {
            self.record(format!("removing {name}"));
            self.check(name)
        }

        fn on_property_removed(&self, _: &str, name: &str) {
            self.record(format!("removed {name}"));
        }

        fn on_properties_cleared(&self, _: &str) {
            self.record("cleared".into());
        }
    }

    fn source_with(recorder: Recorder) -> (MemorySource, Arc<Recorder>) {
        let source = MemorySource::new("test");
        let recorder = Arc::new(recorder);
        source.add_listener(recorder.clone());
        (source, recorder)
    }

    #[test]
    fn test_set_raises_update_events() {
        let (source, recorder) = source_with(Recorder::default());
        source.set("a", "1").unwrap();

        assert_eq!(recorder.take(), ["updating a", "updated a"]);
        assert_eq!(source.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_try_add_raises_add_events_once() {
        let (source, recorder) = source_with(Recorder::default());

        assert!(source.try_add("a", "1").unwrap());
        assert!(!source.try_add("a", "2").unwrap());

        assert_eq!(recorder.take(), ["adding a", "added a"]);
        assert_eq!(source.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_veto_leaves_source_untouched() {
        let (source, recorder) = source_with(Recorder::vetoing("a"));

        let err = source.set("a", "1").unwrap_err();
        assert_eq!(err.property, "a");
        assert!(source.get("a").is_none());
        assert_eq!(recorder.take(), ["updating a"]);
    }

    #[test]
    fn test_get_or_add_and_add_or_update() {
        let source = MemorySource::new("test");

        assert_eq!(source.get_or_add("a", "1").unwrap(), "1");
        assert_eq!(source.get_or_add("a", "2").unwrap(), "1");

        let updated = source
            .add_or_update("a", "ignored", |_, old| format!("{old}{old}"))
            .unwrap();
        assert_eq!(updated, "11");

        let added = source.add_or_update("b", "x", |_, _| unreachable!()).unwrap();
        assert_eq!(added, "x");
    }

    #[test]
    fn test_try_update_compares() {
        let source = MemorySource::with_values("test", [("a", "1")]);

        assert!(!source.try_update("a", "2", "0").unwrap());
        assert!(source.try_update("a", "2", "1").unwrap());
        assert!(!source.try_update("missing", "2", "1").unwrap());
        assert_eq!(source.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_remove_and_clear() {
        let (source, recorder) = source_with(Recorder::default());
        source.load([("a", "1"), ("b", "2")]);
        recorder.take();

        assert_eq!(source.remove("a").unwrap().as_deref(), Some("1"));
        assert_eq!(source.remove("a").unwrap(), None);
        source.clear().unwrap();

        assert!(source.is_empty());
        assert_eq!(recorder.take(), ["removing a", "removed a", "cleared"]);
    }

    #[test]
    fn test_apply_diffs_values() {
        let (source, recorder) = source_with(Recorder::vetoing("c"));
        source.load([("a", "1"), ("b", "2")]);
        recorder.take();

        let summary = source.apply([("b", "20"), ("c", "3"), ("d", "4")]);

        assert_eq!(summary.removed, ["a"]);
        assert_eq!(summary.updated, ["b"]);
        assert_eq!(summary.added, ["d"]);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].property, "c");
        assert_eq!(summary.changed(), 3);

        assert_eq!(source.keys(), ["b", "d"]);
    }

    #[test]
    fn test_listener_may_write_back_on_same_thread() {
        struct Echo(Arc<MemorySource>);

        impl PropertyEventListener for Echo {
            fn on_source_loaded(&self, _: &str) {}

            fn on_adding_property(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), ValidationError> {
                Ok(())
            }

            fn on_property_added(&self, _: &str, _: &str, _: Option<&str>) {}

            fn on_updating_property(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), ValidationError> {
                Ok(())
            }

            fn on_property_updated(&self, _: &str, name: &str, _: Option<&str>) {
                if name == "a" {
                    let _ = self.0.set("a.copy", &self.0.get("a").unwrap_or_default());
                }
            }

            fn on_property_removed(&self, _: &str, _: &str) {}

            fn on_properties_cleared(&self, _: &str) {}
        }

        let source = Arc::new(MemorySource::new("test"));
        source.add_listener(Arc::new(Echo(source.clone())));

        source.set("a", "1").unwrap();
        assert_eq!(source.get("a.copy").as_deref(), Some("1"));
    }
}
