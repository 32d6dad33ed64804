//! # Command Options
//!
//! Immutable option structs for SET, GETEX, and LCS. Each struct knows how to
//! render itself into the trailing command arguments and rejects option
//! combinations the target command does not accept.
//!
//! ## Argument Layout
//!
//! ```text
//! SET key value [NX | XX | IFEQ cmp] [GET] [EX n | PX n | EXAT n | PXAT n | KEEPTTL]
//! GETEX key [EX n | PX n | EXAT n | PXAT n | PERSIST]
//! LCS key1 key2 IDX [MINMATCHLEN n] [WITHMATCHLEN]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SkvError, SkvResult};

/// Key expiration attached to a write or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "count")]
pub enum Expiry {
    /// Expire after `n` seconds (`EX`).
    Seconds(u64),
    /// Expire after `n` milliseconds (`PX`).
    Milliseconds(u64),
    /// Expire at a Unix time in seconds (`EXAT`).
    UnixSeconds(u64),
    /// Expire at a Unix time in milliseconds (`PXAT`).
    UnixMilliseconds(u64),
    /// Keep the existing TTL on overwrite (`KEEPTTL`, SET only).
    KeepTtl,
    /// Remove the existing TTL (`PERSIST`, GETEX only).
    Persist,
}

impl Expiry {
    fn push_args(&self, out: &mut Vec<Vec<u8>>) {
        let (token, count): (&[u8], Option<u64>) = match *self {
            Expiry::Seconds(n) => (b"EX", Some(n)),
            Expiry::Milliseconds(n) => (b"PX", Some(n)),
            Expiry::UnixSeconds(n) => (b"EXAT", Some(n)),
            Expiry::UnixMilliseconds(n) => (b"PXAT", Some(n)),
            Expiry::KeepTtl => (b"KEEPTTL", None),
            Expiry::Persist => (b"PERSIST", None),
        };
        out.push(token.to_vec());
        if let Some(count) = count {
            out.push(count.to_string().into_bytes());
        }
    }
}

/// Write condition for SET.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetCondition {
    /// Only set when the key already exists (`XX`).
    OnlyIfExists,
    /// Only set when the key does not exist (`NX`).
    OnlyIfDoesNotExist,
    /// Only set when the current value equals the comparison value (`IFEQ`).
    OnlyIfEquals(Vec<u8>),
}

/// Options for `SET`.
///
/// A condition that is not met makes the command return nil; with
/// `return_old_value` the previous value (or nil) is returned instead of OK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Conditional write, if any.
    pub condition: Option<SetCondition>,
    /// Return the value stored before the write (`GET`).
    pub return_old_value: bool,
    /// Expiration applied to the new value.
    pub expiry: Option<Expiry>,
}

impl SetOptions {
    /// Options carrying only an expiration.
    pub const fn with_expiry(expiry: Expiry) -> Self {
        SetOptions {
            condition: None,
            return_old_value: false,
            expiry: Some(expiry),
        }
    }

    /// Renders the arguments that follow `SET key value`.
    ///
    /// # Errors
    /// `PERSIST` is rejected; SET only accepts `KEEPTTL` or a concrete expiry.
    pub fn to_args(&self) -> SkvResult<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(4);
        match &self.condition {
            Some(SetCondition::OnlyIfExists) => out.push(b"XX".to_vec()),
            Some(SetCondition::OnlyIfDoesNotExist) => out.push(b"NX".to_vec()),
            Some(SetCondition::OnlyIfEquals(cmp)) => {
                out.push(b"IFEQ".to_vec());
                out.push(cmp.clone());
            }
            None => {}
        }
        if self.return_old_value {
            out.push(b"GET".to_vec());
        }
        if let Some(expiry) = &self.expiry {
            if *expiry == Expiry::Persist {
                return Err(SkvError::InvalidOption("PERSIST is not valid for SET"));
            }
            expiry.push_args(&mut out);
        }
        Ok(out)
    }
}

/// Options for `GETEX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetExOptions {
    /// New expiration for the key, or `Persist` to drop it.
    pub expiry: Option<Expiry>,
}

impl GetExOptions {
    pub const fn with_expiry(expiry: Expiry) -> Self {
        GetExOptions {
            expiry: Some(expiry),
        }
    }

    /// Renders the arguments that follow `GETEX key`.
    ///
    /// # Errors
    /// `KEEPTTL` is rejected; GETEX leaves the TTL alone when no expiry is given.
    pub fn to_args(&self) -> SkvResult<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(2);
        if let Some(expiry) = &self.expiry {
            if *expiry == Expiry::KeepTtl {
                return Err(SkvError::InvalidOption("KEEPTTL is not valid for GETEX"));
            }
            expiry.push_args(&mut out);
        }
        Ok(out)
    }
}

/// Options for `LCS ... IDX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcsIdxOptions {
    /// Drop matches shorter than this many bytes from the report.
    pub min_match_len: Option<u64>,
    /// Append each match's length to its range tuple.
    pub with_match_len: bool,
}

impl LcsIdxOptions {
    /// Renders the arguments that follow `LCS key1 key2`, starting with `IDX`.
    pub fn to_args(&self) -> Vec<Vec<u8>> {
        let mut out = vec![b"IDX".to_vec()];
        if let Some(min) = self.min_match_len {
            out.push(b"MINMATCHLEN".to_vec());
            out.push(min.to_string().into_bytes());
        }
        if self.with_match_len {
            out.push(b"WITHMATCHLEN".to_vec());
        }
        out
    }
}
