//! Validators that can veto a property change before it happens.
//!
//! Validators run when a source announces that it is *about to* add or
//! update a value. They receive the prospective raw value (`None` for
//! absent) and return a [`ValidationError`] to reject it. The first
//! rejection aborts the whole write, so the rejected value never becomes
//! observable.
//!
//! ```rust
//! use dynaprop::{PropertyRegistry, ValidationError, ValidatorFn};
//!
//! let registry = PropertyRegistry::new();
//! let pool = registry.get_or_create("db.pool.size");
//!
//! pool.add_validator(ValidatorFn::new(|value| match value {
//!     Some(v) if v.trim().parse::<u32>().is_ok_and(|n| n > 0) => Ok(()),
//!     Some(v) => Err(ValidationError::new(format!("'{v}' is not a positive integer"))),
//!     None => Ok(()),
//! }));
//!
//! assert!(pool.validate(Some("0")).is_err());
//! assert!(pool.validate(Some("16")).is_ok());
//! ```

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

use crate::{FromRawValue, ValidationError};

/// Checks a prospective raw value.
pub trait Validator: Send + Sync {
    /// Accepts or rejects `value`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] to reject the value.
    fn validate(&self, value: Option<&str>) -> Result<(), ValidationError>;
}

/// A [`Validator`] backed by a closure.
pub struct ValidatorFn<F> {
    f: F,
}

impl<F> ValidatorFn<F> {
    /// Wraps a closure as a validator.
    pub const fn new(f: F) -> Self
    where
        F: Fn(Option<&str>) -> Result<(), ValidationError> + Send + Sync,
    {
        Self { f }
    }
}

impl<F> Validator for ValidatorFn<F>
where
    F: Fn(Option<&str>) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: Option<&str>) -> Result<(), ValidationError> {
        (self.f)(value)
    }
}

impl<F> Debug for ValidatorFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorFn").finish_non_exhaustive()
    }
}

/// Rejects present values that do not convert to `T`.
///
/// Absent and empty values are accepted, since typed reads return the
/// caller's default for them.
pub struct ParsesAs<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRawValue> ParsesAs<T> {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: FromRawValue> Default for ParsesAs<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromRawValue> Validator for ParsesAs<T> {
    fn validate(&self, value: Option<&str>) -> Result<(), ValidationError> {
        match value {
            None | Some("") => Ok(()),

            Some(raw) => T::from_raw(raw).map(|_| ()).map_err(|source| {
                ValidationError::with_source(
                    format!("'{raw}' is not a valid {}", T::type_name()),
                    source,
                )
            }),
        }
    }
}

impl<T> Debug for ParsesAs<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsesAs")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
