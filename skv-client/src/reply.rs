//! # Reply Decoding
//!
//! Turns raw `RespValue` replies into the typed results of the command
//! surface. Server error replies become `ClientError::Server` here, so the
//! command methods only describe the success shape.

use skv_common::{LcsIdxReport, LcsMatch, Nilable};

use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Converts an error reply into `Err`, passing every other reply through.
pub fn check(resp: RespValue) -> ClientResult<RespValue> {
    match resp {
        RespValue::Error(message) => Err(ClientError::Server { message }),
        other => Ok(other),
    }
}

/// Status replies such as `+OK`.
pub fn into_status(resp: RespValue) -> ClientResult<String> {
    match check(resp)? {
        RespValue::Simple(text) => Ok(String::from_utf8_lossy(&text).into_owned()),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Bulk string or nil; status replies count as present values.
pub fn into_nilable_bytes(resp: RespValue) -> ClientResult<Nilable<Vec<u8>>> {
    match check(resp)? {
        RespValue::Bulk(data) => Ok(data.into()),
        RespValue::Simple(text) => Ok(Nilable::Present(text)),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Bulk string that the command never returns as nil.
pub fn into_bytes(resp: RespValue) -> ClientResult<Vec<u8>> {
    match check(resp)? {
        RespValue::Bulk(Some(data)) | RespValue::Simple(data) => Ok(data),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

pub fn into_integer(resp: RespValue) -> ClientResult<i64> {
    match check(resp)? {
        RespValue::Integer(value) => Ok(value),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Integer replies used as flags (`1` / `0`).
pub fn into_bool(resp: RespValue) -> ClientResult<bool> {
    match into_integer(resp)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Floats arrive as bulk strings in RESP2 (e.g. INCRBYFLOAT).
pub fn into_float(resp: RespValue) -> ClientResult<f64> {
    let data = into_bytes(resp)?;
    std::str::from_utf8(&data)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or(ClientError::UnexpectedResponse)
}

/// Array of bulk-or-nil entries (e.g. MGET), in reply order.
pub fn into_nilable_list(resp: RespValue) -> ClientResult<Vec<Nilable<Vec<u8>>>> {
    match check(resp)? {
        RespValue::Array(items) => items.into_iter().map(into_nilable_bytes).collect(),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Decodes the RESP2 form of `LCS ... IDX`:
///
/// ```text
/// *4
///   $7 matches
///   *N  [ [[k1s, k1e], [k2s, k2e], (len)?], ... ]
///   $3 len
///   :L
/// ```
///
/// Field order is not assumed and unknown fields are skipped.
pub fn into_lcs_report(resp: RespValue) -> ClientResult<LcsIdxReport> {
    let RespValue::Array(fields) = check(resp)? else {
        return Err(ClientError::UnexpectedResponse);
    };
    if fields.len() % 2 != 0 {
        return Err(ClientError::UnexpectedResponse);
    }

    let mut report = LcsIdxReport::default();
    let mut iter = fields.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        match name.as_bytes() {
            Some(b"len") => report.len = into_integer(value)?,
            Some(b"matches") => {
                let RespValue::Array(entries) = value else {
                    return Err(ClientError::UnexpectedResponse);
                };
                report.matches = entries
                    .into_iter()
                    .map(decode_lcs_match)
                    .collect::<ClientResult<_>>()?;
            }
            Some(_) => {}
            None => return Err(ClientError::UnexpectedResponse),
        }
    }
    Ok(report)
}

fn decode_lcs_match(entry: RespValue) -> ClientResult<LcsMatch> {
    let RespValue::Array(parts) = entry else {
        return Err(ClientError::UnexpectedResponse);
    };
    let mut parts = parts.into_iter();
    let key1 = decode_range(parts.next())?;
    let key2 = decode_range(parts.next())?;
    let match_len = parts.next().map(into_integer).transpose()?;
    if parts.next().is_some() {
        return Err(ClientError::UnexpectedResponse);
    }
    Ok(LcsMatch {
        key1,
        key2,
        match_len,
    })
}

fn decode_range(value: Option<RespValue>) -> ClientResult<(i64, i64)> {
    match value {
        Some(RespValue::Array(bounds)) => match bounds.as_slice() {
            [RespValue::Integer(start), RespValue::Integer(end)] => Ok((*start, *end)),
            _ => Err(ClientError::UnexpectedResponse),
        },
        _ => Err(ClientError::UnexpectedResponse),
    }
}
