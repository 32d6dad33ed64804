//! # LCS Match Report
//!
//! Typed form of the `LCS key1 key2 IDX` reply: the total LCS length plus the
//! matched byte ranges, in the order the server reports them (last match
//! first).

use serde::{Deserialize, Serialize};

/// One contiguous match between the two strings.
///
/// Ranges are inclusive byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LcsMatch {
    /// `(start, end)` in the first key.
    pub key1: (i64, i64),
    /// `(start, end)` in the second key.
    pub key2: (i64, i64),
    /// Match length, only reported with `WITHMATCHLEN`.
    pub match_len: Option<i64>,
}

impl LcsMatch {
    /// Flat form: `[k1_start, k1_end, k2_start, k2_end]`, plus the match length
    /// when it was requested.
    pub fn to_tuple(&self) -> Vec<i64> {
        let mut out = vec![self.key1.0, self.key1.1, self.key2.0, self.key2.1];
        if let Some(len) = self.match_len {
            out.push(len);
        }
        out
    }
}

/// Full `LCS ... IDX` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcsIdxReport {
    /// Length of the longest common subsequence. Not affected by `MINMATCHLEN`.
    pub len: i64,
    /// Reported matches.
    pub matches: Vec<LcsMatch>,
}

impl LcsIdxReport {
    /// All matches in flat tuple form.
    pub fn match_tuples(&self) -> Vec<Vec<i64>> {
        self.matches.iter().map(LcsMatch::to_tuple).collect()
    }
}
