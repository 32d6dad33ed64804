//! # Nil-Aware Results
//!
//! Commands such as GET may legitimately return nothing. `Nilable<T>` keeps
//! "the key is absent" separate from both errors and empty values.
//!
//! ## Design Principles
//!
//! 1. **Tagged Sum Type**: `Present(T) | Absent`, so callers must handle both.
//! 2. **Absence Is Not Failure**: a missing key is a normal reply, never an error.
//! 3. **Checked Access**: `value()` on `Absent` returns `SkvError::NilValue`
//!    instead of panicking or inventing a zero value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SkvError, SkvResult};

/// A value that the server may or may not have returned.
///
/// # Examples
/// ```rust
/// use skv_common::{Nilable, SkvError};
///
/// let hit = Nilable::Present(b"my_value".to_vec());
/// assert!(!hit.is_nil());
/// assert_eq!(hit.value().unwrap(), b"my_value");
///
/// let miss: Nilable<Vec<u8>> = Nilable::Absent;
/// assert!(miss.is_nil());
/// assert_eq!(miss.value(), Err(SkvError::NilValue));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nilable<T> {
    /// The server returned a value.
    Present(T),
    /// The server returned nil.
    Absent,
}

impl<T> Nilable<T> {
    /// Returns true when no value was returned.
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Nilable::Absent)
    }

    /// Borrows the value.
    ///
    /// # Errors
    /// Returns `SkvError::NilValue` for an absent result.
    pub fn value(&self) -> SkvResult<&T> {
        match self {
            Nilable::Present(value) => Ok(value),
            Nilable::Absent => Err(SkvError::NilValue),
        }
    }

    /// Takes the value out of the wrapper.
    ///
    /// # Errors
    /// Returns `SkvError::NilValue` for an absent result.
    pub fn into_value(self) -> SkvResult<T> {
        match self {
            Nilable::Present(value) => Ok(value),
            Nilable::Absent => Err(SkvError::NilValue),
        }
    }

    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Nilable::Present(value) => Some(value),
            Nilable::Absent => None,
        }
    }

    #[inline]
    pub fn as_ref(&self) -> Nilable<&T> {
        match self {
            Nilable::Present(value) => Nilable::Present(value),
            Nilable::Absent => Nilable::Absent,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Nilable<U> {
        match self {
            Nilable::Present(value) => Nilable::Present(f(value)),
            Nilable::Absent => Nilable::Absent,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Nilable::Present(value) => value,
            Nilable::Absent => default,
        }
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.unwrap_or(T::default())
    }
}

impl<T> From<Option<T>> for Nilable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Nilable::Present(value),
            None => Nilable::Absent,
        }
    }
}

impl<T> From<Nilable<T>> for Option<T> {
    fn from(value: Nilable<T>) -> Self {
        value.into_option()
    }
}

impl<T> Default for Nilable<T> {
    fn default() -> Self {
        Nilable::Absent
    }
}

impl<T: fmt::Display> fmt::Display for Nilable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nilable::Present(value) => write!(f, "{}", value),
            Nilable::Absent => write!(f, "<nil>"),
        }
    }
}

impl Nilable<Vec<u8>> {
    /// Lossy UTF-8 view of a byte payload, `None` when absent.
    pub fn to_string_lossy(&self) -> Option<String> {
        match self {
            Nilable::Present(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Nilable::Absent => None,
        }
    }
}
