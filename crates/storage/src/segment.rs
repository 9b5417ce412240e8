// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment files
//!
//! A partition log is a chain of segment files named
//! `{STREAM}_{partition}_{segmentId}_{prevId}.pbd`. Each file starts with the
//! magic `XRSG`, a `u32` format version, a `u32` schema length and the JSON
//! [`RowSchema`] shared by every block in the segment. Entries follow, each a
//! `u32` length, a `u32` CRC32 of the block bytes, and the block bytes.
//!
//! A truncated or corrupt entry ends the segment; everything before it stays
//! readable.

use crate::log::LogError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xr_core::{encode_block, BlockHeader, RowSchema};

pub const SEGMENT_MAGIC: &[u8; 4] = b"XRSG";
pub const SEGMENT_VERSION: u32 = 1;
pub const SEGMENT_EXTENSION: &str = "pbd";

const PREAMBLE: usize = 12;
const ENTRY_HEADER: usize = 8;

/// Why a file name is not a usable segment name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Not a `.pbd` file at all
    NotSegment,
    /// A `.pbd` file whose name does not parse
    InvalidName,
}

/// Parsed segment file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentName {
    pub stream: String,
    pub partition: u32,
    pub id: u64,
    pub prev_id: u64,
}

impl SegmentName {
    pub fn new(stream: &str, partition: u32, id: u64, prev_id: u64) -> Self {
        Self {
            stream: stream.to_uppercase(),
            partition,
            id,
            prev_id,
        }
    }

    pub fn parse(file_name: &str) -> Result<Self, NameError> {
        let stem = file_name
            .strip_suffix(SEGMENT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or(NameError::NotSegment)?;

        // Stream names may contain underscores, so split from the right
        let mut parts = stem.rsplitn(4, '_');
        let prev_id = parts.next().and_then(|p| p.parse().ok());
        let id = parts.next().and_then(|p| p.parse().ok());
        let partition = parts.next().and_then(|p| p.parse().ok());
        let stream = parts.next().filter(|s| !s.is_empty());

        match (stream, partition, id, prev_id) {
            (Some(stream), Some(partition), Some(id), Some(prev_id)) => Ok(Self {
                stream: stream.to_string(),
                partition,
                id,
                prev_id,
            }),
            _ => Err(NameError::InvalidName),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.{SEGMENT_EXTENSION}",
            self.stream, self.partition, self.id, self.prev_id
        )
    }

    pub fn is_stream(&self, stream: &str) -> bool {
        self.stream.eq_ignore_ascii_case(stream)
    }
}

/// Writes one segment file
pub struct SegmentWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl SegmentWriter {
    pub fn create(dir: &Path, name: &SegmentName, schema: &RowSchema) -> Result<Self, LogError> {
        let path = dir.join(name.file_name());
        let schema_bytes = schema.to_bytes().map_err(|e| LogError::BadHeader {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let file = File::create(&path).map_err(|e| LogError::io(&path, e))?;
        let mut writer = Self {
            path,
            file: BufWriter::new(file),
        };
        let mut preamble = Vec::with_capacity(PREAMBLE + schema_bytes.len());
        preamble.extend_from_slice(SEGMENT_MAGIC);
        preamble.extend_from_slice(&SEGMENT_VERSION.to_le_bytes());
        preamble.extend_from_slice(&(schema_bytes.len() as u32).to_le_bytes());
        preamble.extend_from_slice(&schema_bytes);
        writer.write(&preamble)?;
        Ok(writer)
    }

    /// Append an already encoded block
    pub fn append(&mut self, block: &[u8]) -> Result<(), LogError> {
        let mut entry = Vec::with_capacity(ENTRY_HEADER + block.len());
        entry.extend_from_slice(&(block.len() as u32).to_le_bytes());
        entry.extend_from_slice(&crc32fast::hash(block).to_le_bytes());
        entry.extend_from_slice(block);
        self.write(&entry)?;
        Ok(())
    }

    pub fn append_records(&mut self, header: &BlockHeader, records: &[Vec<u8>]) -> Result<(), LogError> {
        self.append(&encode_block(header, records))
    }

    /// Flush and sync the file, returning its path
    pub fn finish(mut self) -> Result<PathBuf, LogError> {
        self.file.flush().map_err(|e| LogError::io(&self.path, e))?;
        self.file
            .get_ref()
            .sync_all()
            .map_err(|e| LogError::io(&self.path, e))?;
        Ok(self.path)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        self.file
            .write_all(bytes)
            .map_err(|e| LogError::io(&self.path, e))
    }
}

/// A segment file loaded into memory with its valid entries indexed
pub struct SegmentReader {
    path: PathBuf,
    schema: Arc<RowSchema>,
    data: Vec<u8>,
    entries: Vec<Range<usize>>,
    corrupt_tail: bool,
}

impl SegmentReader {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let data = std::fs::read(path).map_err(|e| LogError::io(path, e))?;
        let bad_header = |reason: &str| LogError::BadHeader {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if data.get(..4) != Some(&SEGMENT_MAGIC[..]) {
            return Err(bad_header("missing segment magic"));
        }
        let version = read_u32(&data, 4).ok_or_else(|| bad_header("truncated preamble"))?;
        if version != SEGMENT_VERSION {
            return Err(bad_header(&format!("unsupported version {version}")));
        }
        let schema_len =
            read_u32(&data, 8).ok_or_else(|| bad_header("truncated preamble"))? as usize;
        let schema_bytes = data
            .get(PREAMBLE..PREAMBLE + schema_len)
            .ok_or_else(|| bad_header("truncated schema"))?;
        let schema =
            RowSchema::from_bytes(schema_bytes).map_err(|e| bad_header(&e.to_string()))?;

        let mut reader = Self {
            path: path.to_path_buf(),
            schema: Arc::new(schema),
            data,
            entries: Vec::new(),
            corrupt_tail: false,
        };
        reader.index(PREAMBLE + schema_len);
        Ok(reader)
    }

    fn index(&mut self, mut offset: usize) {
        while offset < self.data.len() {
            let entry = read_u32(&self.data, offset)
                .zip(read_u32(&self.data, offset + 4))
                .and_then(|(len, crc)| {
                    let start = offset + ENTRY_HEADER;
                    let range = start..start + len as usize;
                    let bytes = self.data.get(range.clone())?;
                    (crc32fast::hash(bytes) == crc).then_some(range)
                });

            match entry {
                Some(range) => {
                    offset = range.end;
                    self.entries.push(range);
                }
                None => {
                    tracing::warn!(
                        path = %self.path.display(),
                        offset,
                        valid_blocks = self.entries.len(),
                        "truncated or corrupt segment entry, ignoring rest of segment"
                    );
                    self.corrupt_tail = true;
                    break;
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_corrupt_tail(&self) -> bool {
        self.corrupt_tail
    }

    /// Raw bytes of entry `index` with its file offset
    pub fn entry(&self, index: usize) -> Option<(u64, &[u8])> {
        let range = self.entries.get(index)?;
        let bytes = self.data.get(range.clone())?;
        Some(((range.start - ENTRY_HEADER) as u64, bytes))
    }
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
