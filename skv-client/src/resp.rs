//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies for the pooled
//! connections, keeping allocations under control.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Callers provide the line and write buffers.
//! 3. **Binary-Safe**: Bulk strings are raw bytes; nothing assumes UTF-8.
//! 4. **Fail Fast**: Invalid framing returns `ClientError::Protocol`.

use std::io::BufRead;

use bytes::{BufMut, BytesMut};

use crate::error::{ClientError, ClientResult};

/// Nesting limit for array replies; LCS IDX is the deepest shape we decode.
const MAX_DEPTH: usize = 8;

/// Largest bulk string a server may send (`proto-max-bulk-len`, 512 MiB).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// RESP2 reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies, kept verbatim.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings; `None` for the null bulk and the null array.
    Bulk(Option<Vec<u8>>),
    /// *... arrays.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Returns true for `$-1` / `*-1`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Bulk(None))
    }

    /// Byte payload of simple strings and non-null bulk strings.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::Simple(data) | RespValue::Bulk(Some(data)) => Some(data),
            _ => None,
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut BytesMut) {
    let payload: usize = args.iter().map(|arg| arg.len() + 16).sum();
    out.reserve(payload + 16);
    out.put_u8(b'*');
    push_usize(out, args.len());
    out.put_slice(b"\r\n");
    for arg in args {
        out.put_u8(b'$');
        push_usize(out, arg.len());
        out.put_slice(b"\r\n");
        out.put_slice(arg);
        out.put_slice(b"\r\n");
    }
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    read_value(reader, line_buf, 0)
}

fn read_value<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<RespValue> {
    if depth > MAX_DEPTH {
        return Err(ClientError::Protocol);
    }
    read_line(reader, line_buf)?;
    let Some((&marker, rest)) = line_buf.split_first() else {
        return Err(ClientError::Protocol);
    };

    match marker {
        b'+' => Ok(RespValue::Simple(rest.to_vec())),
        b'-' => Ok(RespValue::Error(rest.to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
        b'$' => {
            let len = parse_i64(rest)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_i64(rest)?;
            if len < 0 {
                return Ok(RespValue::Bulk(None));
            }
            let mut items = Vec::with_capacity(len.min(1024) as usize);
            for _ in 0..len {
                items.push(read_value(reader, line_buf, depth + 1)?);
            }
            Ok(RespValue::Array(items))
        }
        _ => Err(ClientError::Protocol),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    if len > MAX_BULK_LEN {
        return Err(ClientError::Protocol);
    }
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(ClientError::Protocol);
    }
    Ok(RespValue::Bulk(Some(data)))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        // Peer closed the connection between replies.
        return Err(ClientError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(ClientError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    let (negative, digits) = match data.split_first() {
        Some((&b'-', rest)) => (true, rest),
        _ => (false, data),
    };
    if digits.is_empty() {
        return Err(ClientError::Protocol);
    }

    // Negative values accumulate downwards so i64::MIN stays representable.
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(ClientError::Protocol);
        }
        let digit = (b - b'0') as i64;
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or(ClientError::Protocol)?;
    }
    Ok(value)
}

fn push_usize(out: &mut BytesMut, mut value: usize) {
    // Digits go through a stack buffer so length prefixes never allocate.
    let mut buf = [0u8; 20];
    let mut len = 0;
    loop {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
        if value == 0 {
            break;
        }
    }
    buf[..len].reverse();
    out.put_slice(&buf[..len]);
}
