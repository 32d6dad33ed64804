//! # Hash Slots
//!
//! Cluster keyspace partitioning: every key maps to one of 16384 slots via
//! CRC16/XMODEM over its hash tag.
//!
//! ## Hash Tags
//!
//! ```text
//! key              hashed bytes
//! ---------------  ------------
//! user:1000        user:1000
//! {user}1          user
//! {user}2          user          (same slot as {user}1)
//! foo{}bar         foo{}bar      (empty tag: whole key)
//! foo{{bar}}zap    {bar          (first '{' to the next '}')
//! ```

use crate::error::{SkvError, SkvResult};

/// Number of hash slots in a cluster.
pub const SLOT_COUNT: u16 = 16384;

/// CRC16/XMODEM lookup table (polynomial 0x1021), built at compile time.
const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut idx = 0;
    while idx < 256 {
        let mut crc = (idx as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[idx] = crc;
        idx += 1;
    }
    table
}

/// CRC16/XMODEM checksum as used by cluster slot assignment.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc = (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ byte) as usize];
    }
    crc
}

/// Returns the part of `key` that decides its slot.
///
/// That is the content between the first `{` and the next `}` when it is
/// non-empty, otherwise the whole key.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    match key[open + 1..].iter().position(|&b| b == b'}') {
        Some(len) if len > 0 => &key[open + 1..open + 1 + len],
        _ => key,
    }
}

/// Computes the cluster slot of a key.
#[inline]
pub fn hash_slot(key: &[u8]) -> u16 {
    crc16(hash_tag(key)) % SLOT_COUNT
}

/// Returns the slot shared by all keys.
///
/// `Ok(None)` for an empty key list.
///
/// # Errors
/// Returns `SkvError::CrossSlot` naming the first slot and the first key slot
/// that disagrees with it.
pub fn common_slot<K: AsRef<[u8]>>(keys: &[K]) -> SkvResult<Option<u16>> {
    let mut iter = keys.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let first = hash_slot(first.as_ref());
    for key in iter {
        let slot = hash_slot(key.as_ref());
        if slot != first {
            return Err(SkvError::CrossSlot {
                first,
                conflicting: slot,
            });
        }
    }
    Ok(Some(first))
}
