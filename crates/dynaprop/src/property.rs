//! The property entity: one named raw value with typed views, validators
//! and change callbacks.
//!
//! # Update Protocol
//!
//! A write to a property goes through three separate steps:
//!
//! 1. [`Property::validate`] runs every validator against the prospective
//!    value. Nothing is mutated, and the first rejection aborts the write.
//! 2. [`Property::try_commit`] compares the value with the current one. If it
//!    differs, the raw value is replaced, every typed cache is flushed and
//!    `updated_at` is stamped, all under the property's write lock.
//! 3. [`Property::notify`] runs the change callbacks in registration order,
//!    outside the lock. A panicking callback is logged and skipped.
//!
//! [`Property::update`] is steps 2 and 3 together.
//!
//! # Concurrency
//!
//! Raw value, timestamp and caches share one [`parking_lot::RwLock`]. A typed
//! read that finds its cache populated only takes the read lock; populating
//! takes the write lock, so a parse never runs against a value that is being
//! replaced. Callbacks and validators live in [`ArcSwap`] snapshots: adding
//! one while another thread is notifying never disturbs that notification
//! (and the new callback may or may not see it).

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::cache::{PropertyCache, TypeCaches};
use crate::{Clock, ConversionError, FromRawValue, ValidationError, Validator};

/// Change callback. Called with no arguments after the value changed.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Token returned by [`Property::add_callback`], used to remove the callback.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CallbackId(u64);

/// Outcome of [`Property::try_commit`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum Commit {
    /// The new value equalled the current one. Nothing happened.
    Unchanged,

    /// The value was replaced.
    Changed,
}

impl Commit {
    /// Returns `true` for [`Commit::Changed`].
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

#[derive(Clone)]
struct CallbackEntry {
    id: CallbackId,
    callback: Callback,
}

struct PropertyState {
    raw: Option<String>,
    updated_at: SystemTime,
    caches: TypeCaches,
}

/// A named, dynamically updated property.
///
/// Properties are created and owned by a
/// [`PropertyRegistry`](crate::PropertyRegistry); there is exactly one per
/// name, shared through `Arc<Property>`.
///
/// # Example
///
/// ```rust
/// use dynaprop::PropertyRegistry;
///
/// let registry = PropertyRegistry::new();
/// let timeout = registry.get_or_create("http.timeout.ms");
///
/// assert_eq!(timeout.get(500_u64).unwrap(), 500);
///
/// timeout.update(Some("1500"));
/// assert_eq!(timeout.get(500_u64).unwrap(), 1500);
/// assert_eq!(timeout.get_string(None).as_deref(), Some("1500"));
/// ```
pub struct Property {
    name: String,
    state: RwLock<PropertyState>,
    callbacks: ArcSwap<Vec<CallbackEntry>>,
    validators: ArcSwap<Vec<Arc<dyn Validator>>>,
    next_callback_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Property {
    /// Creates an absent property stamped at the epoch.
    pub(crate) fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(PropertyState {
                raw: None,
                updated_at: SystemTime::UNIX_EPOCH,
                caches: TypeCaches::default(),
            }),
            callbacks: ArcSwap::from_pointee(Vec::new()),
            validators: ArcSwap::from_pointee(Vec::new()),
            next_callback_id: AtomicU64::new(0),
            clock,
        }
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the raw value last changed, or the epoch if it never has.
    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.state.read().updated_at
    }

    /// The current raw value, `None` if absent.
    #[must_use]
    pub fn raw_value(&self) -> Option<String> {
        self.state.read().raw.clone()
    }

    /// Reads the value as `T`, returning `None` if it is absent or empty.
    ///
    /// The raw value is parsed at most once per change; later reads of the
    /// same type come from the cache.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if the raw value does not parse as `T`.
    /// The same error is returned on every read until the value changes.
    pub fn get_optional<T: FromRawValue>(&self) -> Result<Option<T>, ConversionError> {
        {
            let state = self.state.read();
            if let Some(outcome) = state.caches.get::<T>().and_then(PropertyCache::peek) {
                return outcome;
            }
        }

        let mut state = self.state.write();
        let PropertyState { raw, caches, .. } = &mut *state;
        caches.populate::<T>(&self.name, raw.as_deref())
    }

    /// Reads the value as `T`, returning `default` if it is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if a present value does not parse as `T`.
    /// The default is *not* substituted in that case.
    pub fn get<T: FromRawValue>(&self, default: T) -> Result<T, ConversionError> {
        Ok(self.get_optional()?.unwrap_or(default))
    }

    /// Reads the value as a string, returning `default` if it is absent or empty.
    #[must_use]
    pub fn get_string(&self, default: Option<&str>) -> Option<String> {
        match self.get_optional::<String>() {
            Ok(Some(value)) => Some(value),
            // String conversion cannot fail, so only the absent case lands here.
            Ok(None) | Err(_) => default.map(str::to_string),
        }
    }

    /// Registers a callback to run after every change of the value.
    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        let entry = CallbackEntry {
            id,
            callback: Arc::new(callback),
        };

        self.callbacks.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(entry.clone());
            next
        });

        id
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let previous = self.callbacks.rcu(|current| {
            current
                .iter()
                .filter(|entry| entry.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });

        previous.iter().any(|entry| entry.id == id)
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.load().len()
    }

    /// Registers a validator to run before every sourced add or update.
    pub fn add_validator<V>(&self, validator: V)
    where
        V: Validator + 'static,
    {
        let validator: Arc<dyn Validator> = Arc::new(validator);

        self.validators.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(validator.clone());
            next
        });
    }

    /// Number of registered validators.
    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.load().len()
    }

    /// Runs the validators, in registration order, against a prospective value.
    ///
    /// Never mutates the property. A validator that panics counts as a rejection.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`], tagged with this property's name.
    pub fn validate(&self, value: Option<&str>) -> Result<(), ValidationError> {
        let validators = self.validators.load_full();

        for validator in validators.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| validator.validate(value))) {
                Ok(Ok(())) => {}

                Ok(Err(err)) => return Err(err.for_property(&self.name)),

                Err(payload) => {
                    let message = format!(
                        "unexpected panic during validation: {}",
                        panic_message(&*payload)
                    );
                    return Err(ValidationError::new(message).for_property(&self.name));
                }
            }
        }

        Ok(())
    }

    /// Replaces the raw value if it differs from the current one.
    ///
    /// On change, every typed cache is flushed and `updated_at` is set to the
    /// clock's current time before the lock is released. Callbacks are *not*
    /// run; see [`notify`](Self::notify).
    pub fn try_commit(&self, value: Option<&str>) -> Commit {
        let mut state = self.state.write();

        if state.raw.as_deref() == value {
            tracing::trace!(property = %self.name, "value unchanged");
            return Commit::Unchanged;
        }

        state.raw = value.map(str::to_string);
        state.caches.flush_all();
        state.updated_at = self.clock.now();

        tracing::debug!(property = %self.name, value = ?value, "property value changed");
        Commit::Changed
    }

    /// Runs every callback in registration order.
    ///
    /// A panicking callback is logged and does not stop the others.
    pub fn notify(&self) {
        let callbacks = self.callbacks.load_full();

        for entry in callbacks.iter() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)())) {
                tracing::error!(
                    property = %self.name,
                    callback = entry.id.0,
                    panic = %panic_message(&*payload),
                    "error in property callback"
                );
            }
        }
    }

    /// Commits `value` and, if it changed, notifies callbacks.
    ///
    /// Returns `true` if the value changed. Validators are not consulted; call
    /// [`validate`](Self::validate) first when the write should be vetoable.
    pub fn update(&self, value: Option<&str>) -> bool {
        let changed = self.try_commit(value).is_changed();
        if changed {
            self.notify();
        }
        changed
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        match &state.raw {
            Some(raw) => write!(f, "Property[name={}, value={raw}]", self.name),
            None => write!(f, "Property[name={}, value=<absent>]", self.name),
        }
    }
}

impl Debug for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("raw", &state.raw)
            .field("updated_at", &state.updated_at)
            .field("caches", &state.caches)
            .field("callbacks", &self.callback_count())
            .field("validators", &self.validator_count())
            .finish()
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
