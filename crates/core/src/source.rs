// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity of the data a decoder instance exports

use serde::Serialize;
use std::fmt;

/// Stream, partition and the unique nonce a decoder writes under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Source {
    pub stream: String,
    pub partition: u32,
    pub nonce: String,
}

impl Source {
    /// Source for a whole-partition recovery run.
    ///
    /// The nonce is `{prefix}_{partition}` where the prefix defaults to the
    /// upper-cased stream name.
    pub fn for_partition(stream: &str, partition: u32, prefix: Option<&str>) -> Self {
        let prefix = prefix.map_or_else(|| stream.to_uppercase(), str::to_string);
        Self {
            stream: stream.to_string(),
            partition,
            nonce: format!("{prefix}_{partition}"),
        }
    }

    /// Source for one stitched range, nonce `{STREAM}_{partition}_{start}_{end}`
    pub fn for_range(stream: &str, partition: u32, start: u64, end: u64) -> Self {
        Self {
            stream: stream.to_string(),
            partition,
            nonce: format!("{}_{partition}_{start}_{end}", stream.to_uppercase()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nonce)
    }
}
