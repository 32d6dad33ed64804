//! # Contract Errors
//!
//! Errors raised before a command reaches the wire: reading an absent
//! result, invalid option combinations, and multi-key calls that span
//! cluster slots.

use thiserror::Error;

/// Result alias for client-side validation.
pub type SkvResult<T> = Result<T, SkvError>;

/// Client-side contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkvError {
    /// `value()` was called on an absent result.
    #[error("value requested from a nil result")]
    NilValue,

    /// Keys of one multi-key call hash to different slots.
    #[error("keys in request don't hash to the same slot ({first} != {conflicting})")]
    CrossSlot { first: u16, conflicting: u16 },

    /// The option is not accepted by the command it was passed to.
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),

    /// An argument cannot be encoded for the server.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Immediate re-authentication needs a password to authenticate with.
    #[error("immediate authentication requires a password")]
    MissingPassword,
}

impl SkvError {
    /// Stable numeric code, handy for logs and FFI-style callers.
    pub const fn code(&self) -> u16 {
        match self {
            SkvError::NilValue => 1,
            SkvError::CrossSlot { .. } => 2,
            SkvError::InvalidOption(_) => 3,
            SkvError::InvalidArgument(_) => 4,
            SkvError::MissingPassword => 5,
        }
    }
}
