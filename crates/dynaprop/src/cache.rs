//! Lazily parsed, per-type views of a property's raw value.
//!
//! A [`PropertyCache<T>`] remembers the outcome of parsing the raw value as
//! `T`: the value, the failure, or the fact that there was nothing to parse.
//! A property keeps one cache per requested type in [`TypeCaches`] and
//! flushes all of them whenever its raw value changes.
//!
//! Caches carry no lock of their own. They live inside the owning property's
//! state and are only touched with that state locked, which is what keeps a
//! populate from racing a commit.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::{ConversionError, FromRawValue};

/// Outcome of the last parse attempt.
#[derive(Clone, Debug)]
enum Cached<T> {
    /// The raw value was absent or empty. Each reader supplies its own default.
    Absent,
    Value(T),
    Failed(ConversionError),
}

impl<T: Clone> Cached<T> {
    fn resolve(&self) -> Result<Option<T>, ConversionError> {
        match self {
            Self::Absent => Ok(None),
            Self::Value(value) => Ok(Some(value.clone())),
            Self::Failed(err) => Err(err.clone()),
        }
    }
}

/// Cached interpretation of one property's raw value as `T`.
///
/// Parsing happens at most once per population cycle; [`flush`](Self::flush)
/// starts a new cycle.
pub struct PropertyCache<T> {
    slot: Option<Cached<T>>,
}

impl<T: FromRawValue> PropertyCache<T> {
    /// Creates an unpopulated cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Returns `true` if a parse has happened since the last flush.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns the cached outcome without parsing, or `None` if unpopulated.
    ///
    /// `Ok(None)` means the raw value was absent.
    pub fn peek(&self) -> Option<Result<Option<T>, ConversionError>> {
        self.slot.as_ref().map(Cached::resolve)
    }

    /// Returns the cached outcome, parsing `raw` first if unpopulated.
    ///
    /// An absent or empty `raw` is recorded as absent without parsing.
    ///
    /// # Errors
    ///
    /// Returns the cached [`ConversionError`] if `raw` does not parse as `T`.
    pub fn populate(
        &mut self,
        property: &str,
        raw: Option<&str>,
    ) -> Result<Option<T>, ConversionError> {
        if let Some(cached) = &self.slot {
            return cached.resolve();
        }

        let cached = match raw {
            None | Some("") => {
                tracing::debug!(property = %property, "value is empty, using the default value");
                Cached::Absent
            }

            Some(raw) => match T::from_raw(raw) {
                Ok(value) => Cached::Value(value),

                Err(source) => {
                    let err = ConversionError::new(property, raw, T::type_name(), source);
                    tracing::warn!(property = %property, error = %err, "unable to parse property value");
                    Cached::Failed(err)
                }
            },
        };

        let outcome = cached.resolve();
        self.slot = Some(cached);
        outcome
    }

    /// Discards the cached outcome.
    pub fn flush(&mut self) {
        self.slot = None;
    }
}

impl<T: FromRawValue> Default for PropertyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for PropertyCache<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = match &self.slot {
            None => "not cached",
            Some(Cached::Absent) => "absent",
            Some(Cached::Value(_)) => "value",
            Some(Cached::Failed(_)) => "failed",
        };
        f.debug_struct("PropertyCache").field("state", &state).finish()
    }
}

/// Object-safe view of a [`PropertyCache`] of any type.
trait ErasedCache: Send + Sync {
    fn flush(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: FromRawValue> ErasedCache for PropertyCache<T> {
    fn flush(&mut self) {
        Self::flush(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One [`PropertyCache`] per requested type, created on first use.
#[derive(Default)]
pub(crate) struct TypeCaches {
    entries: HashMap<TypeId, Box<dyn ErasedCache>>,
}

impl TypeCaches {
    /// Returns the cache for `T` if one has been created.
    pub(crate) fn get<T: FromRawValue>(&self) -> Option<&PropertyCache<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.as_any().downcast_ref())
    }

    /// Parses through the cache for `T`, creating it if needed.
    pub(crate) fn populate<T: FromRawValue>(
        &mut self,
        property: &str,
        raw: Option<&str>,
    ) -> Result<Option<T>, ConversionError> {
        let entry = self
            .entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(PropertyCache::<T>::new()));

        match entry.as_any_mut().downcast_mut::<PropertyCache<T>>() {
            Some(cache) => cache.populate(property, raw),
            // Entries are keyed by TypeId, so this arm only exists to avoid a panic path.
            None => PropertyCache::<T>::new().populate(property, raw),
        }
    }

    /// Flushes every cache.
    pub(crate) fn flush_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.flush();
        }
    }

    /// Number of distinct types cached.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Debug for TypeCaches {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCaches")
            .field("types", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_parses_once() {
        let mut cache = PropertyCache::<u16>::new();
        assert!(!cache.is_populated());
        assert!(cache.peek().is_none());

        assert_eq!(cache.populate("port", Some("8080")).unwrap(), Some(8080));
        assert!(cache.is_populated());

        // A populated cache ignores the raw value it is handed.
        assert_eq!(cache.populate("port", Some("9090")).unwrap(), Some(8080));
    }

    #[test]
    fn test_absent_and_empty_are_not_parsed() {
        let mut cache = PropertyCache::<u16>::new();
        assert_eq!(cache.populate("port", None).unwrap(), None);

        cache.flush();
        assert_eq!(cache.populate("port", Some("")).unwrap(), None);
    }

    #[test]
    fn test_failure_is_cached_until_flush() {
        let mut cache = PropertyCache::<i32>::new();

        let first = cache.populate("retries", Some("many")).unwrap_err();
        assert_eq!(first.value, "many");
        assert_eq!(first.expected_type, "i32");

        let again = cache.peek().unwrap().unwrap_err();
        assert!(std::sync::Arc::ptr_eq(&first.source, &again.source));

        cache.flush();
        assert!(!cache.is_populated());
        assert_eq!(cache.populate("retries", Some("3")).unwrap(), Some(3));
    }

    #[test]
    fn test_type_caches_are_independent() {
        let mut caches = TypeCaches::default();

        assert!(caches.populate::<i32>("p", Some("x")).is_err());
        assert_eq!(
            caches.populate::<String>("p", Some("x")).unwrap().as_deref(),
            Some("x")
        );
        assert_eq!(caches.len(), 2);

        assert!(caches.get::<i32>().unwrap().is_populated());
        assert!(caches.get::<bool>().is_none());

        caches.flush_all();
        assert!(!caches.get::<i32>().unwrap().is_populated());
        assert!(!caches.get::<String>().unwrap().is_populated());
    }
}
