// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory block log for tests
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::log::{BlockLog, LogError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use xr_core::{encode_block, encode_row, Block, BlockHeader, ReleaseToken, RowError, RowSchema, Value};

/// Recorded log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogCall {
    Scan,
    Poll,
    Release { start_seq: u64 },
}

#[derive(Default)]
struct MemoryLogState {
    blocks: Vec<(BlockHeader, Arc<RowSchema>, Vec<u8>)>,
    pending: VecDeque<usize>,
    released: Vec<u64>,
    calls: Vec<LogCall>,
    fail_poll_at: Option<usize>,
    polls: usize,
}

/// Block log held in memory
///
/// Clones share state, so a test can keep a handle to inspect releases after
/// moving the log into an engine.
#[derive(Clone)]
pub struct MemoryLog {
    stream: String,
    partition: u32,
    state: Arc<Mutex<MemoryLogState>>,
}

impl MemoryLog {
    pub fn new(stream: &str, partition: u32) -> Self {
        Self {
            stream: stream.to_string(),
            partition,
            state: Arc::new(Mutex::new(MemoryLogState::default())),
        }
    }

    /// Append a block of raw row records
    pub fn push_records(&self, header: BlockHeader, schema: &Arc<RowSchema>, records: &[Vec<u8>]) {
        let bytes = encode_block(&header, records);
        let mut state = self.lock();
        let index = state.blocks.len();
        state.blocks.push((header, Arc::clone(schema), bytes));
        state.pending.push_back(index);
    }

    /// Append a block holding `rows`, starting at `start_seq`
    pub fn push_rows(&self, start_seq: u64, schema: &Arc<RowSchema>, rows: &[Vec<Value>]) -> Result<(), RowError> {
        let records = rows
            .iter()
            .map(|values| encode_row(schema, values))
            .collect::<Result<Vec<_>, _>>()?;
        self.push_records(BlockHeader::new(start_seq, records.len() as u32), schema, &records);
        Ok(())
    }

    /// Make the `n`th poll (zero based) fail
    pub fn fail_poll_at(&self, n: usize) {
        self.lock().fail_poll_at = Some(n);
    }

    /// Start sequences of released blocks, in release order
    pub fn released(&self) -> Vec<u64> {
        self.lock().released.clone()
    }

    pub fn calls(&self) -> Vec<LogCall> {
        self.lock().calls.clone()
    }

    /// Blocks not yet polled or polled and not released, as a fresh log
    pub fn reopen(&self) -> Self {
        let state = self.lock();
        let released = &state.released;
        let fresh = Self::new(&self.stream, self.partition);
        {
            let mut fresh_state = fresh.lock();
            for (header, schema, bytes) in &state.blocks {
                if released.contains(&header.start_seq) {
                    continue;
                }
                let index = fresh_state.blocks.len();
                fresh_state.blocks.push((*header, Arc::clone(schema), bytes.clone()));
                fresh_state.pending.push_back(index);
            }
        }
        fresh
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryLogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlockLog for MemoryLog {
    fn stream(&self) -> &str {
        &self.stream
    }

    fn partition(&self) -> u32 {
        self.partition
    }

    fn scan(&self, visitor: &mut dyn FnMut(&BlockHeader)) -> Result<(), LogError> {
        let headers: Vec<BlockHeader> = {
            let mut state = self.lock();
            state.calls.push(LogCall::Scan);
            state.blocks.iter().map(|(h, _, _)| *h).collect()
        };
        for header in &headers {
            visitor(header);
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Block>, LogError> {
        let mut state = self.lock();
        state.calls.push(LogCall::Poll);
        let poll = state.polls;
        state.polls += 1;
        if state.fail_poll_at == Some(poll) {
            return Err(LogError::Injected(format!("poll {poll} failed")));
        }

        let Some(index) = state.pending.pop_front() else {
            return Ok(None);
        };
        let Some((_, schema, bytes)) = state.blocks.get(index) else {
            return Ok(None);
        };
        Block::parse(bytes, Arc::clone(schema), ReleaseToken::new(index as u64))
            .map(Some)
            .map_err(|source| LogError::Block {
                path: "memory".into(),
                offset: index as u64,
                source,
            })
    }

    fn release(&mut self, block: Block) -> Result<(), LogError> {
        let mut state = self.lock();
        let start_seq = block.start_seq();
        state.calls.push(LogCall::Release { start_seq });
        state.released.push(start_seq);
        Ok(())
    }
}
