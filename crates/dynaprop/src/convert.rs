//! Conversion from raw property strings to typed values.
//!
//! Every property stores its value as a string. Typed reads convert that
//! string through [`FromRawValue`], and the result is cached per type until
//! the raw value changes.
//!
//! # Supported Types
//!
//! | Type | Accepted Input |
//! |------|----------------|
//! | `String` | Anything, verbatim |
//! | `bool` | `true` / `false`, any case |
//! | `i8` - `i128`, `isize`, `u8` - `u128`, `usize` | Decimal integers |
//! | `f32`, `f64` | Decimal or exponent floats |
//! | `char` | A single character |
//! | `IpAddr`, `Ipv4Addr`, `Ipv6Addr`, `SocketAddr` | Standard address syntax |
//! | `PathBuf` | Anything, verbatim |
//! | `Option<T>` | Whatever `T` accepts |
//!
//! All types except `String` and `PathBuf` ignore surrounding whitespace.
//!
//! # Custom Types
//!
//! ```rust
//! use dynaprop::{BoxError, FromRawValue};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Mode {
//!     Fast,
//!     Safe,
//! }
//!
//! impl FromRawValue for Mode {
//!     fn from_raw(raw: &str) -> Result<Self, BoxError> {
//!         match raw.trim() {
//!             "fast" => Ok(Mode::Fast),
//!             "safe" => Ok(Mode::Safe),
//!             other => Err(format!("unknown mode '{other}'").into()),
//!         }
//!     }
//! }
//!
//! assert_eq!(dynaprop::convert::<Mode>("fast").unwrap(), Mode::Fast);
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use crate::BoxError;

/// A type that can be parsed from a raw property string.
pub trait FromRawValue: Sized + Clone + Send + Sync + 'static {
    /// Parses the raw string.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` is not a valid representation of `Self`.
    fn from_raw(raw: &str) -> Result<Self, BoxError>;

    /// Type name used in conversion error messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Converts a raw string into `T`.
///
/// # Errors
///
/// Returns the converter's error when `raw` does not parse as `T`.
pub fn convert<T: FromRawValue>(raw: &str) -> Result<T, BoxError> {
    T::from_raw(raw)
}

/// Generates `FromRawValue` for `FromStr` types, trimming the input first.
macro_rules! impl_from_raw_trimmed {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromRawValue for $t {
                fn from_raw(raw: &str) -> Result<Self, BoxError> {
                    raw.trim().parse::<$t>().map_err(Into::into)
                }

                fn type_name() -> &'static str {
                    stringify!($t)
                }
            }
        )+
    };
}

impl_from_raw_trimmed!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, IpAddr,
    Ipv4Addr, Ipv6Addr, SocketAddr,
);

impl FromRawValue for String {
    fn from_raw(raw: &str) -> Result<Self, BoxError> {
        Ok(raw.to_string())
    }

    fn type_name() -> &'static str {
        "String"
    }
}

impl FromRawValue for PathBuf {
    fn from_raw(raw: &str) -> Result<Self, BoxError> {
        Ok(Self::from(raw))
    }

    fn type_name() -> &'static str {
        "PathBuf"
    }
}

impl FromRawValue for bool {
    fn from_raw(raw: &str) -> Result<Self, BoxError> {
        let trimmed = raw.trim();

        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(format!("'{raw}' is not a valid boolean").into())
        }
    }

    fn type_name() -> &'static str {
        "bool"
    }
}

// Nullable: the raw string parses as the inner type.
impl<T: FromRawValue> FromRawValue for Option<T> {
    fn from_raw(raw: &str) -> Result<Self, BoxError> {
        T::from_raw(raw).map(Some)
    }

    fn type_name() -> &'static str {
        T::type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_string_to_string() {
        assert_eq!(convert::<String>("value").unwrap(), "value");
        assert_eq!(convert::<String>("  padded ").unwrap(), "  padded ");
    }

    #[test]
    fn test_convert_string_to_int() {
        assert_eq!(convert::<i32>("10").unwrap(), 10);
        assert_eq!(convert::<i32>(" -7 ").unwrap(), -7);
        assert!(convert::<u8>("256").is_err());
        assert!(convert::<i32>("ten").is_err());
    }

    #[test]
    fn test_convert_bool_case_insensitive() {
        assert!(convert::<bool>("true").unwrap());
        assert!(convert::<bool>("TRUE").unwrap());
        assert!(!convert::<bool>(" False ").unwrap());
        assert!(convert::<bool>("yes").is_err());
    }

    #[test]
    fn test_convert_nullable_bool() {
        assert_eq!(convert::<Option<bool>>("true").unwrap(), Some(true));
        assert_eq!(convert::<Option<bool>>("false").unwrap(), Some(false));
        assert!(convert::<Option<bool>>("maybe").is_err());
    }

    #[test]
    fn test_convert_network_types() {
        let addr = convert::<SocketAddr>("127.0.0.1:8080").unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(convert::<IpAddr>("::1").unwrap().is_loopback());
        assert!(convert::<Ipv4Addr>("not-an-ip").is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(<u16 as FromRawValue>::type_name(), "u16");
        assert_eq!(<String as FromRawValue>::type_name(), "String");
        assert_eq!(<Option<bool> as FromRawValue>::type_name(), "bool");
    }
}
