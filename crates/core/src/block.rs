// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export blocks
//!
//! A block is a fixed 28-byte little-endian header followed by a payload of
//! `u32`-length-prefixed row records:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 8    | start sequence |
//! | 8      | 8    | committed seq  |
//! | 16     | 4    | row count      |
//! | 20     | 8    | unique id      |

use crate::schema::RowSchema;
use crate::tracker::SeqRange;
use std::sync::Arc;
use thiserror::Error;

pub const HEADER_SIZE: usize = 28;

/// Errors parsing a block
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block too short for header: {0} bytes")]
    ShortHeader(usize),
    #[error("row record {index} truncated at payload offset {offset}")]
    TruncatedRecord { index: u32, offset: usize },
    #[error("block holds {actual} row records, header says {expected}")]
    RowCount { expected: u32, actual: u32 },
}

/// Fixed header of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub start_seq: u64,
    pub committed_seq: u64,
    pub row_count: u32,
    pub unique_id: u64,
}

impl BlockHeader {
    pub fn new(start_seq: u64, row_count: u32) -> Self {
        Self {
            start_seq,
            committed_seq: start_seq.saturating_add(u64::from(row_count)).saturating_sub(1),
            row_count,
            unique_id: 0,
        }
    }

    pub fn with_committed(mut self, committed_seq: u64) -> Self {
        self.committed_seq = committed_seq;
        self
    }

    pub fn with_unique_id(mut self, unique_id: u64) -> Self {
        self.unique_id = unique_id;
        self
    }

    /// Sequence number of the last row; `start_seq - 1` for an empty block
    pub fn last_seq(&self) -> u64 {
        self.start_seq
            .saturating_add(u64::from(self.row_count))
            .saturating_sub(1)
    }

    /// Sequence range covered by the block, `None` when it holds no rows
    pub fn seq_range(&self) -> Option<SeqRange> {
        (self.row_count > 0).then(|| SeqRange::new(self.start_seq, self.last_seq()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, BlockError> {
        let header = bytes
            .get(..HEADER_SIZE)
            .ok_or(BlockError::ShortHeader(bytes.len()))?;
        let u64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&header[at..at + 8]);
            u64::from_le_bytes(buf)
        };
        let mut count = [0u8; 4];
        count.copy_from_slice(&header[16..20]);

        Ok(Self {
            start_seq: u64_at(0),
            committed_seq: u64_at(8),
            row_count: u32::from_le_bytes(count),
            unique_id: u64_at(20),
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&self.start_seq.to_le_bytes());
        out[8..16].copy_from_slice(&self.committed_seq.to_le_bytes());
        out[16..20].copy_from_slice(&self.row_count.to_le_bytes());
        out[20..28].copy_from_slice(&self.unique_id.to_le_bytes());
        out
    }
}

/// Opaque handle the log uses to account for a released block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseToken(u64);

impl ReleaseToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A block polled from a partition log
///
/// Not `Clone`: a block is handed back to its log exactly once.
#[derive(Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub schema: Arc<RowSchema>,
    payload: Vec<u8>,
    token: ReleaseToken,
}

impl Block {
    /// Parse header and payload, checking the payload holds exactly
    /// `row_count` well-formed records.
    pub fn parse(bytes: &[u8], schema: Arc<RowSchema>, token: ReleaseToken) -> Result<Self, BlockError> {
        let header = BlockHeader::parse(bytes)?;
        let block = Self {
            header,
            schema,
            payload: bytes[HEADER_SIZE..].to_vec(),
            token,
        };

        let mut actual = 0u32;
        for record in block.records() {
            record?;
            actual += 1;
        }
        if actual != header.row_count {
            return Err(BlockError::RowCount {
                expected: header.row_count,
                actual,
            });
        }
        Ok(block)
    }

    pub fn start_seq(&self) -> u64 {
        self.header.start_seq
    }

    pub fn last_seq(&self) -> u64 {
        self.header.last_seq()
    }

    pub fn row_count(&self) -> u32 {
        self.header.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.header.row_count == 0
    }

    pub fn token(&self) -> ReleaseToken {
        self.token
    }

    /// Iterate the raw row records in payload order
    pub fn records(&self) -> Records<'_> {
        Records {
            payload: &self.payload,
            offset: 0,
            index: 0,
        }
    }
}

/// Encode a block from a header and raw row records
pub fn encode_block(header: &BlockHeader, records: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = records.iter().map(|r| r.len() + 4).sum();
    let mut out = Vec::with_capacity(HEADER_SIZE + payload_len);
    out.extend_from_slice(&header.encode());
    for record in records {
        out.extend_from_slice(&(record.len() as u32).to_le_bytes());
        out.extend_from_slice(record);
    }
    out
}

/// Iterator over the length-prefixed row records of a block payload
pub struct Records<'a> {
    payload: &'a [u8],
    offset: usize,
    index: u32,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<&'a [u8], BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.payload.len() {
            return None;
        }
        let truncated = BlockError::TruncatedRecord {
            index: self.index,
            offset: self.offset,
        };
        let record = self
            .payload
            .get(self.offset..self.offset + 4)
            .and_then(|len| <[u8; 4]>::try_from(len).ok())
            .map(|len| u32::from_le_bytes(len) as usize)
            .and_then(|len| self.payload.get(self.offset + 4..self.offset + 4 + len));

        match record {
            Some(record) => {
                self.offset += 4 + record.len();
                self.index += 1;
                Some(Ok(record))
            }
            None => {
                self.offset = self.payload.len();
                Some(Err(truncated))
            }
        }
    }
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod tests;
