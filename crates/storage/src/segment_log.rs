// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`BlockLog`] over a chain of segment files

use crate::discovery::{discover_stream, SegmentFile};
use crate::log::{BlockLog, LogError};
use crate::segment::SegmentReader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use xr_core::{Block, BlockHeader, ReleaseToken, Retention};

/// Reads one partition's segments in chain order
pub struct SegmentLog {
    stream: String,
    partition: u32,
    segments: Vec<SegmentFile>,
    retention: Retention,
    next_segment: usize,
    current: Option<OpenSegment>,
    held: HashMap<u64, HeldSegment>,
    tokens: HashMap<u64, u64>,
    next_token: u64,
}

struct OpenSegment {
    id: u64,
    reader: SegmentReader,
    next_entry: usize,
}

/// Accounting for a segment with blocks handed out
struct HeldSegment {
    path: PathBuf,
    unreleased: usize,
    exhausted: bool,
    reclaimable: bool,
}

impl SegmentLog {
    /// Open the log of `stream`/`partition` found under `dir`
    pub fn open(dir: &Path, stream: &str, partition: u32, retention: Retention) -> Result<Self, LogError> {
        let segments = discover_stream(dir, stream)?
            .remove(&partition)
            .unwrap_or_default();
        Ok(Self::from_segments(stream, partition, segments, retention))
    }

    pub fn from_segments(
        stream: &str,
        partition: u32,
        segments: Vec<SegmentFile>,
        retention: Retention,
    ) -> Self {
        tracing::debug!(stream, partition, segments = segments.len(), "opened segment log");
        Self {
            stream: stream.to_string(),
            partition,
            segments,
            retention,
            next_segment: 0,
            current: None,
            held: HashMap::new(),
            tokens: HashMap::new(),
            next_token: 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn open_next(&mut self) -> Result<bool, LogError> {
        let Some(file) = self.segments.get(self.next_segment) else {
            return Ok(false);
        };
        self.next_segment += 1;

        let reader = SegmentReader::open(&file.path)?;
        self.held.insert(
            file.name.id,
            HeldSegment {
                path: file.path.clone(),
                unreleased: 0,
                exhausted: false,
                reclaimable: !reader.has_corrupt_tail(),
            },
        );
        self.current = Some(OpenSegment {
            id: file.name.id,
            reader,
            next_entry: 0,
        });
        Ok(true)
    }

    fn maybe_reclaim(&mut self, id: u64) -> Result<(), LogError> {
        let Some(held) = self.held.get(&id) else {
            return Ok(());
        };
        if !held.exhausted || held.unreleased > 0 {
            return Ok(());
        }
        let held = self.held.remove(&id);
        if self.retention != Retention::Reclaim {
            return Ok(());
        }
        match held {
            Some(held) if held.reclaimable => {
                std::fs::remove_file(&held.path).map_err(|e| LogError::io(&held.path, e))?;
                tracing::info!(segment = %held.path.display(), "reclaimed fully released segment");
            }
            Some(held) => {
                tracing::warn!(segment = %held.path.display(), "keeping segment with corrupt tail");
            }
            None => {}
        }
        Ok(())
    }
}

impl BlockLog for SegmentLog {
    fn stream(&self) -> &str {
        &self.stream
    }

    fn partition(&self) -> u32 {
        self.partition
    }

    fn scan(&self, visitor: &mut dyn FnMut(&BlockHeader)) -> Result<(), LogError> {
        for file in &self.segments {
            let reader = SegmentReader::open(&file.path)?;
            for index in 0..reader.len() {
                let Some((offset, bytes)) = reader.entry(index) else {
                    break;
                };
                let header = BlockHeader::parse(bytes).map_err(|source| LogError::Block {
                    path: file.path.clone(),
                    offset,
                    source,
                })?;
                visitor(&header);
            }
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Block>, LogError> {
        loop {
            if self.current.is_none() && !self.open_next()? {
                return Ok(None);
            }
            let Some(open) = self.current.as_mut() else {
                return Ok(None);
            };

            if let Some((offset, bytes)) = open.reader.entry(open.next_entry) {
                open.next_entry += 1;
                let token = self.next_token;
                let block = Block::parse(bytes, open.reader.schema().clone(), ReleaseToken::new(token))
                    .map_err(|source| LogError::Block {
                        path: open.reader.path().to_path_buf(),
                        offset,
                        source,
                    })?;
                self.next_token += 1;
                self.tokens.insert(token, open.id);
                if let Some(held) = self.held.get_mut(&open.id) {
                    held.unreleased += 1;
                }
                return Ok(Some(block));
            }

            let id = open.id;
            self.current = None;
            if let Some(held) = self.held.get_mut(&id) {
                held.exhausted = true;
            }
            self.maybe_reclaim(id)?;
        }
    }

    fn release(&mut self, block: Block) -> Result<(), LogError> {
        let token = block.token().id();
        let id = self
            .tokens
            .remove(&token)
            .ok_or(LogError::UnknownRelease { token })?;
        if let Some(held) = self.held.get_mut(&id) {
            held.unreleased = held.unreleased.saturating_sub(1);
        }
        self.maybe_reclaim(id)
    }
}

#[cfg(test)]
#[path = "segment_log_tests.rs"]
mod tests;
