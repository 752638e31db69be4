//! Conversion of raw request strings into typed values.
//!
//! Three mechanisms turn strings into field values, checked in this order
//! for every field type:
//!
//! 1. [`UnmarshalParams`]: the type consumes every value sent for its key.
//! 2. [`UnmarshalParam`]: the type consumes the first value.
//! 3. Built-in [`Coerce`] for primitives, strings and timestamps, then
//!    [`FromStr`] for anything else that parses from text.
//!
//! The choice is made at compile time by `#[derive(Bind)]`; a field type
//! satisfying none of them fails with a configuration error the first time
//! a value arrives for it.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::error::Error as StdError;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;
use thiserror::Error;

use crate::error::BoxError;

/// Date format accepted for [`NaiveDate`] fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Custom parsing from the first value sent for a key.
///
/// The value is applied onto the existing field, so implementations may
/// accumulate (append to a list) or replace.
///
/// # Example
///
/// ```rust
/// use syndesis::{BoxError, UnmarshalParam};
///
/// #[derive(Debug, Default)]
/// struct Csv(Vec<String>);
///
/// impl UnmarshalParam for Csv {
///     fn unmarshal_param(&mut self, value: &str) -> Result<(), BoxError> {
///         self.0.extend(value.split(',').map(str::to_owned));
///         Ok(())
///     }
/// }
/// ```
pub trait UnmarshalParam {
    /// Applies `value` onto `self`.
    fn unmarshal_param(&mut self, value: &str) -> Result<(), BoxError>;
}

/// Custom parsing from every value sent for a key, in arrival order.
///
/// Preferred over [`UnmarshalParam`] when a type implements both.
pub trait UnmarshalParams {
    /// Applies `values` onto `self`.
    fn unmarshal_params(&mut self, values: &[String]) -> Result<(), BoxError>;
}

/// Built-in conversion from a single raw string.
pub trait Coerce: Sized {
    /// Converts `value` into `Self`.
    fn coerce(value: &str) -> Result<Self, CoerceError>;
}

/// Failure converting raw strings into a field value.
#[derive(Debug, Error)]
pub enum CoerceError {
    /// Integer parse failure or overflow.
    #[error("parsing {value:?}: {source}")]
    Int {
        /// Raw input.
        value: String,
        /// Parser error.
        source: ParseIntError,
    },

    /// Floating point parse failure.
    #[error("parsing {value:?}: {source}")]
    Float {
        /// Raw input.
        value: String,
        /// Parser error.
        source: ParseFloatError,
    },

    /// Input is not one of the accepted boolean tokens.
    #[error("parsing {value:?}: invalid boolean")]
    Bool {
        /// Raw input.
        value: String,
    },

    /// Timestamp or date parse failure.
    #[error("parsing time {value:?}: {source}")]
    Time {
        /// Raw input.
        value: String,
        /// Parser error.
        source: chrono::ParseError,
    },

    /// `FromStr` failure for a text-parsed type.
    #[error("parsing {value:?}: {source}")]
    Text {
        /// Raw input.
        value: String,
        /// Parser error.
        source: BoxError,
    },

    /// Error returned by an [`UnmarshalParam`] or [`UnmarshalParams`] impl.
    #[error("{0}")]
    Custom(#[source] BoxError),

    /// The field type has no conversion from strings.
    #[error("unsupported field type `{type_name}`")]
    Unsupported {
        /// Rust type name of the field.
        type_name: &'static str,
    },

    /// Uploaded files cannot be stored in a plain `FileHeader` field.
    #[error("binding to FileHeader by value is not supported, use Option<FileHeader>")]
    FileByValue,
}

impl CoerceError {
    /// Whether this error describes the destination shape rather than the
    /// input.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::FileByValue)
    }

    /// Whether the message already quotes the offending raw value.
    #[must_use]
    pub fn mentions_value(&self) -> bool {
        !matches!(
            self,
            Self::Custom(_) | Self::Unsupported { .. } | Self::FileByValue
        )
    }
}

macro_rules! coerce_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Coerce for $ty {
                fn coerce(value: &str) -> Result<Self, CoerceError> {
                    let raw = if value.is_empty() { "0" } else { value };
                    raw.parse().map_err(|source| CoerceError::Int {
                        value: value.to_owned(),
                        source,
                    })
                }
            }
        )*
    };
}

macro_rules! coerce_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Coerce for $ty {
                fn coerce(value: &str) -> Result<Self, CoerceError> {
                    let raw = if value.is_empty() { "0" } else { value };
                    raw.parse().map_err(|source| CoerceError::Float {
                        value: value.to_owned(),
                        source,
                    })
                }
            }
        )*
    };
}

coerce_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
coerce_float!(f32, f64);

impl Coerce for bool {
    fn coerce(value: &str) -> Result<Self, CoerceError> {
        match value {
            "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            _ => Err(CoerceError::Bool {
                value: value.to_owned(),
            }),
        }
    }
}

impl Coerce for String {
    fn coerce(value: &str) -> Result<Self, CoerceError> {
        Ok(value.to_owned())
    }
}

impl Coerce for DateTime<FixedOffset> {
    fn coerce(value: &str) -> Result<Self, CoerceError> {
        DateTime::parse_from_rfc3339(value).map_err(|source| CoerceError::Time {
            value: value.to_owned(),
            source,
        })
    }
}

impl Coerce for DateTime<Utc> {
    fn coerce(value: &str) -> Result<Self, CoerceError> {
        DateTime::<FixedOffset>::coerce(value).map(|dt| dt.with_timezone(&Utc))
    }
}

impl Coerce for NaiveDate {
    fn coerce(value: &str) -> Result<Self, CoerceError> {
        NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| CoerceError::Time {
            value: value.to_owned(),
            source,
        })
    }
}

fn first(values: &[String]) -> &str {
    values.first().map_or("", String::as_str)
}

/// Conversion via [`UnmarshalParams`].
#[derive(Debug, Clone, Copy)]
pub struct ViaParams;

/// Conversion via [`UnmarshalParam`].
#[derive(Debug, Clone, Copy)]
pub struct ViaParam;

/// Conversion via [`Coerce`].
#[derive(Debug, Clone, Copy)]
pub struct ViaCoerce;

/// Conversion via [`FromStr`].
#[derive(Debug, Clone, Copy)]
pub struct ViaFromStr;

/// No conversion is available.
#[derive(Debug, Clone, Copy)]
pub struct Unsupported;

/// Writes a whole value sequence into one field value.
pub trait FieldStrategy<T> {
    /// Applies `values` onto an existing value.
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError>;

    /// Produces a new value from `values`.
    fn fresh(&self, values: &[String]) -> Result<T, CoerceError>;
}

/// Converts one raw value into one sequence element.
pub trait ElementStrategy<T> {
    /// Converts `value`.
    fn element(&self, value: &str) -> Result<T, CoerceError>;
}

impl<T: UnmarshalParams + Default> FieldStrategy<T> for ViaParams {
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError> {
        target.unmarshal_params(values).map_err(CoerceError::Custom)
    }

    fn fresh(&self, values: &[String]) -> Result<T, CoerceError> {
        let mut value = T::default();
        self.assign(&mut value, values)?;
        Ok(value)
    }
}

impl<T: UnmarshalParam + Default> FieldStrategy<T> for ViaParam {
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError> {
        target
            .unmarshal_param(first(values))
            .map_err(CoerceError::Custom)
    }

    fn fresh(&self, values: &[String]) -> Result<T, CoerceError> {
        self.element(first(values))
    }
}

impl<T: UnmarshalParam + Default> ElementStrategy<T> for ViaParam {
    fn element(&self, value: &str) -> Result<T, CoerceError> {
        let mut out = T::default();
        out.unmarshal_param(value).map_err(CoerceError::Custom)?;
        Ok(out)
    }
}

impl<T: Coerce> FieldStrategy<T> for ViaCoerce {
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError> {
        *target = T::coerce(first(values))?;
        Ok(())
    }

    fn fresh(&self, values: &[String]) -> Result<T, CoerceError> {
        T::coerce(first(values))
    }
}

impl<T: Coerce> ElementStrategy<T> for ViaCoerce {
    fn element(&self, value: &str) -> Result<T, CoerceError> {
        T::coerce(value)
    }
}

impl<T> FieldStrategy<T> for ViaFromStr
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError> {
        *target = self.element(first(values))?;
        Ok(())
    }

    fn fresh(&self, values: &[String]) -> Result<T, CoerceError> {
        self.element(first(values))
    }
}

impl<T> ElementStrategy<T> for ViaFromStr
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    fn element(&self, value: &str) -> Result<T, CoerceError> {
        value.parse().map_err(|err: T::Err| CoerceError::Text {
            value: value.to_owned(),
            source: Box::new(err),
        })
    }
}

impl<T> FieldStrategy<T> for Unsupported {
    fn assign(&self, _target: &mut T, _values: &[String]) -> Result<(), CoerceError> {
        Err(CoerceError::Unsupported {
            type_name: std::any::type_name::<T>(),
        })
    }

    fn fresh(&self, _values: &[String]) -> Result<T, CoerceError> {
        Err(CoerceError::Unsupported {
            type_name: std::any::type_name::<T>(),
        })
    }
}

impl<T> ElementStrategy<T> for Unsupported {
    fn element(&self, _value: &str) -> Result<T, CoerceError> {
        Err(CoerceError::Unsupported {
            type_name: std::any::type_name::<T>(),
        })
    }
}
