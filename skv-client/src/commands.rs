//! # Command Surface
//!
//! Purpose: Define the typed command API once and share it between the
//! standalone and cluster clients.
//!
//! ## Design Principles
//! 1. **Template Method**: Every command is a provided trait method written
//!    against `CommandExecutor`; a client only supplies routing and execution.
//! 2. **Borrow-Friendly API**: Keys and values are `&[u8]`; results own their bytes.
//! 3. **Byte Semantics**: Ranges and lengths are byte offsets, never characters.
//! 4. **Fail Fast**: Routing and option validation run before any network I/O.

use std::time::Duration;

use skv_common::{GetExOptions, LcsIdxOptions, LcsIdxReport, Nilable, SetOptions, SkvError};
use tracing::trace;

use crate::error::ClientResult;
use crate::reply;
use crate::resp::RespValue;
use crate::routing::Route;

/// Execution seam implemented by each client variant.
pub trait CommandExecutor {
    /// Validates the keys of one call and picks its destination.
    fn route(&self, keys: &[&[u8]]) -> ClientResult<Route>;

    /// Sends one command along `route` and returns the raw reply.
    fn execute(&self, route: Route, args: &[&[u8]]) -> ClientResult<RespValue>;

    /// Routes by `keys`, then executes `args`.
    fn keyed(&self, keys: &[&[u8]], args: &[&[u8]]) -> ClientResult<RespValue> {
        let route = self.route(keys)?;
        if let Some(name) = args.first() {
            trace!(command = %String::from_utf8_lossy(name), ?route, "dispatch");
        }
        self.execute(route, args)
    }
}

/// TTL state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// String commands.
pub trait StringCommands: CommandExecutor {
    /// SET without options. Returns "OK".
    fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<String> {
        reply::into_status(self.keyed(&[key], &[b"SET", key, value])?)
    }

    /// SET with condition, GET, and expiry options.
    ///
    /// Returns "OK", the previous value when `return_old_value` is set, or
    /// `Absent` when the condition prevented the write (or there was no
    /// previous value).
    fn set_with_options(
        &self,
        key: &[u8],
        value: &[u8],
        options: &SetOptions,
    ) -> ClientResult<Nilable<Vec<u8>>> {
        let extra = options.to_args()?;
        let mut args: Vec<&[u8]> = vec![b"SET".as_slice(), key, value];
        args.extend(extra.iter().map(Vec::as_slice));
        reply::into_nilable_bytes(self.keyed(&[key], &args)?)
    }

    fn get(&self, key: &[u8]) -> ClientResult<Nilable<Vec<u8>>> {
        reply::into_nilable_bytes(self.keyed(&[key], &[b"GET", key])?)
    }

    /// GETEX without options; behaves like GET and leaves the TTL alone.
    fn get_ex(&self, key: &[u8]) -> ClientResult<Nilable<Vec<u8>>> {
        reply::into_nilable_bytes(self.keyed(&[key], &[b"GETEX", key])?)
    }

    /// GETEX that also sets or removes the key's expiration.
    fn get_ex_with_options(
        &self,
        key: &[u8],
        options: &GetExOptions,
    ) -> ClientResult<Nilable<Vec<u8>>> {
        let extra = options.to_args()?;
        let mut args: Vec<&[u8]> = vec![b"GETEX".as_slice(), key];
        args.extend(extra.iter().map(Vec::as_slice));
        reply::into_nilable_bytes(self.keyed(&[key], &args)?)
    }

    /// Returns the value and deletes the key.
    fn get_del(&self, key: &[u8]) -> ClientResult<Nilable<Vec<u8>>> {
        reply::into_nilable_bytes(self.keyed(&[key], &[b"GETDEL", key])?)
    }

    /// Sets every pair. Returns "OK".
    fn mset(&self, pairs: &[(&[u8], &[u8])]) -> ClientResult<String> {
        let (keys, args) = pair_args(b"MSET", pairs);
        reply::into_status(self.keyed(&keys, &args)?)
    }

    /// Values in key order; missing keys are `Absent`.
    fn mget(&self, keys: &[&[u8]]) -> ClientResult<Vec<Nilable<Vec<u8>>>> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
        args.push(b"MGET");
        args.extend_from_slice(keys);
        reply::into_nilable_list(self.keyed(keys, &args)?)
    }

    /// Sets every pair only if none of the keys exist. All or nothing.
    fn msetnx(&self, pairs: &[(&[u8], &[u8])]) -> ClientResult<bool> {
        let (keys, args) = pair_args(b"MSETNX", pairs);
        reply::into_bool(self.keyed(&keys, &args)?)
    }

    fn incr(&self, key: &[u8]) -> ClientResult<i64> {
        reply::into_integer(self.keyed(&[key], &[b"INCR", key])?)
    }

    fn incr_by(&self, key: &[u8], amount: i64) -> ClientResult<i64> {
        let amount = amount.to_string();
        reply::into_integer(self.keyed(&[key], &[b"INCRBY", key, amount.as_bytes()])?)
    }

    /// Adds a float. The stored value must parse as a number; otherwise the
    /// server error is returned.
    fn incr_by_float(&self, key: &[u8], amount: f64) -> ClientResult<f64> {
        if !amount.is_finite() {
            return Err(SkvError::InvalidArgument(format!("increment must be finite, got {amount}")).into());
        }
        let amount = amount.to_string();
        reply::into_float(self.keyed(&[key], &[b"INCRBYFLOAT", key, amount.as_bytes()])?)
    }

    fn decr(&self, key: &[u8]) -> ClientResult<i64> {
        reply::into_integer(self.keyed(&[key], &[b"DECR", key])?)
    }

    fn decr_by(&self, key: &[u8], amount: i64) -> ClientResult<i64> {
        let amount = amount.to_string();
        reply::into_integer(self.keyed(&[key], &[b"DECRBY", key, amount.as_bytes()])?)
    }

    /// Byte length of the stored value; 0 for a missing key.
    fn strlen(&self, key: &[u8]) -> ClientResult<i64> {
        reply::into_integer(self.keyed(&[key], &[b"STRLEN", key])?)
    }

    /// Overwrites bytes starting at `offset` and returns the new byte length.
    ///
    /// Offsets are bytes: writing into the middle of a multi-byte character
    /// replaces only the covered bytes.
    fn set_range(&self, key: &[u8], offset: u64, value: &[u8]) -> ClientResult<i64> {
        let offset = offset.to_string();
        reply::into_integer(self.keyed(&[key], &[b"SETRANGE", key, offset.as_bytes(), value])?)
    }

    /// Inclusive byte range; negative indices count from the end.
    ///
    /// The result may end inside a multi-byte character.
    fn get_range(&self, key: &[u8], start: i64, end: i64) -> ClientResult<Vec<u8>> {
        let start = start.to_string();
        let end = end.to_string();
        reply::into_bytes(self.keyed(
            &[key],
            &[b"GETRANGE", key, start.as_bytes(), end.as_bytes()],
        )?)
    }

    /// Appends and returns the new byte length.
    fn append(&self, key: &[u8], value: &[u8]) -> ClientResult<i64> {
        reply::into_integer(self.keyed(&[key], &[b"APPEND", key, value])?)
    }

    /// Longest common subsequence of the two values.
    fn lcs(&self, key1: &[u8], key2: &[u8]) -> ClientResult<Vec<u8>> {
        reply::into_bytes(self.keyed(&[key1, key2], &[b"LCS", key1, key2])?)
    }

    fn lcs_len(&self, key1: &[u8], key2: &[u8]) -> ClientResult<i64> {
        reply::into_integer(self.keyed(&[key1, key2], &[b"LCS", key1, key2, b"LEN"])?)
    }

    /// LCS match positions (`IDX`), optionally filtered and annotated.
    fn lcs_with_options(
        &self,
        key1: &[u8],
        key2: &[u8],
        options: &LcsIdxOptions,
    ) -> ClientResult<LcsIdxReport> {
        let extra = options.to_args();
        let mut args: Vec<&[u8]> = vec![b"LCS".as_slice(), key1, key2];
        args.extend(extra.iter().map(Vec::as_slice));
        reply::into_lcs_report(self.keyed(&[key1, key2], &args)?)
    }
}

/// Keyspace and connection-level commands.
pub trait GenericCommands: CommandExecutor {
    /// Pings a node. Returns PONG, or echoes the payload.
    fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let resp = match payload {
            Some(data) => self.execute(Route::Any, &[b"PING", data])?,
            None => self.execute(Route::Any, &[b"PING"])?,
        };
        reply::into_bytes(resp)
    }

    /// Deletes keys and returns how many existed.
    fn del(&self, keys: &[&[u8]]) -> ClientResult<i64> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
        args.push(b"DEL");
        args.extend_from_slice(keys);
        reply::into_integer(self.keyed(keys, &args)?)
    }

    /// Counts existing keys (duplicates count twice).
    fn exists(&self, keys: &[&[u8]]) -> ClientResult<i64> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
        args.push(b"EXISTS");
        args.extend_from_slice(keys);
        reply::into_integer(self.keyed(keys, &args)?)
    }

    fn ttl(&self, key: &[u8]) -> ClientResult<KeyTtl> {
        match reply::into_integer(self.keyed(&[key], &[b"TTL", key])?)? {
            -2 => Ok(KeyTtl::Missing),
            -1 => Ok(KeyTtl::NoExpiry),
            secs if secs >= 0 => Ok(KeyTtl::ExpiresIn(Duration::from_secs(secs as u64))),
            _ => Err(crate::error::ClientError::UnexpectedResponse),
        }
    }
}

/// Password rotation for established clients.
pub trait ConnectionManagement {
    /// Replaces the password used for new connections.
    ///
    /// `None` or an empty string clears it. With `immediate_auth`, connections
    /// are re-authenticated right away and a rejected password is returned as
    /// the server error. Returns "OK".
    fn update_connection_password(
        &self,
        password: Option<&str>,
        immediate_auth: bool,
    ) -> ClientResult<String>;

    /// Clears the stored password. Existing connections stay authenticated.
    fn reset_connection_password(&self) -> ClientResult<String> {
        self.update_connection_password(None, false)
    }
}

/// Normalizes a rotation request; empty passwords mean "no password".
pub(crate) fn rotation_password(
    password: Option<&str>,
    immediate_auth: bool,
) -> ClientResult<Option<String>> {
    let password = password.filter(|p| !p.is_empty()).map(str::to_string);
    if immediate_auth && password.is_none() {
        return Err(SkvError::MissingPassword.into());
    }
    Ok(password)
}

fn pair_args<'a>(
    command: &'static [u8],
    pairs: &[(&'a [u8], &'a [u8])],
) -> (Vec<&'a [u8]>, Vec<&'a [u8]>) {
    let keys: Vec<&[u8]> = pairs.iter().map(|(key, _)| *key).collect();
    let mut args: Vec<&[u8]> = Vec::with_capacity(pairs.len() * 2 + 1);
    args.push(command);
    for &(key, value) in pairs {
        args.push(key);
        args.push(value);
    }
    (keys, args)
}
