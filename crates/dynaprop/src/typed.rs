//! Typed views over a registry property.
//!
//! A [`TypedProperty<T>`] pairs one shared [`Property`] with a default of
//! type `T`. Several views with different defaults may wrap the same
//! property; they all see the same raw value and share its parse cache.

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::{CallbackId, ConversionError, FromRawValue, Property, ValidationError, Validator};

/// A property read as `T`, falling back to a default when absent.
///
/// # Example
///
/// ```rust
/// use dynaprop::PropertyRegistry;
///
/// let registry = PropertyRegistry::new();
/// let retries = registry.typed("client.retries", 3_u32);
///
/// assert_eq!(retries.value().unwrap(), 3);
///
/// retries.property().update(Some("5"));
/// assert_eq!(retries.value().unwrap(), 5);
/// ```
pub struct TypedProperty<T> {
    property: Arc<Property>,
    default: T,
    callbacks: Mutex<Vec<CallbackId>>,
}

/// A property read as an optional string.
pub type StringProperty = TypedProperty<Option<String>>;

impl<T: FromRawValue> TypedProperty<T> {
    /// Wraps `property` with `default`.
    pub fn new(property: Arc<Property>, default: T) -> Self {
        Self {
            property,
            default,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The underlying property.
    #[must_use]
    pub const fn property(&self) -> &Arc<Property> {
        &self.property
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.property.name()
    }

    /// When the raw value last changed.
    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.property.updated_at()
    }

    /// The default returned while the value is absent.
    #[must_use]
    pub const fn default_value(&self) -> &T {
        &self.default
    }

    /// The current value, or the default if absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if the raw value does not parse as `T`.
    pub fn value(&self) -> Result<T, ConversionError> {
        self.property.get(self.default.clone())
    }

    /// Registers a change callback on the underlying property.
    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.property.add_callback(callback);
        self.callbacks.lock().push(id);
        id
    }

    /// Removes every callback added through this view.
    ///
    /// Callbacks registered directly on the property, or through other
    /// views, stay in place.
    pub fn remove_all_callbacks(&self) {
        let ids = std::mem::take(&mut *self.callbacks.lock());
        for id in ids {
            self.property.remove_callback(id);
        }
    }

    /// Registers a validator on the underlying property.
    pub fn add_validator<V>(&self, validator: V)
    where
        V: Validator + 'static,
    {
        self.property.add_validator(validator);
    }

    /// Runs the property's validators against a prospective value.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`].
    pub fn validate(&self, value: Option<&str>) -> Result<(), ValidationError> {
        self.property.validate(value)
    }
}

impl<T: FromRawValue + Display> TypedProperty<T> {
    /// The current value rendered as a string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if the raw value does not parse as `T`.
    pub fn value_as_string(&self) -> Result<String, ConversionError> {
        self.value().map(|value| value.to_string())
    }

    /// The default rendered as a string.
    #[must_use]
    pub fn default_value_as_string(&self) -> String {
        self.default.to_string()
    }
}

impl StringProperty {
    /// Returns `true` if the value (or default) is absent or only whitespace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value()
            .ok()
            .flatten()
            .is_none_or(|value| value.trim().is_empty())
    }
}

impl<T: Debug> Debug for TypedProperty<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedProperty")
            .field("name", &self.property.name())
            .field("raw", &self.property.raw_value())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
