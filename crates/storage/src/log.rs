// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-partition block log interface

use std::path::PathBuf;
use thiserror::Error;
use xr_core::{Block, BlockError, BlockHeader};

/// Errors reading or releasing log blocks
#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad segment header in {path}: {reason}")]
    BadHeader { path: PathBuf, reason: String },
    #[error("bad block in {path} at offset {offset}: {source}")]
    Block {
        path: PathBuf,
        offset: u64,
        #[source]
        source: BlockError,
    },
    #[error("released block {token} was not handed out by this log")]
    UnknownRelease { token: u64 },
    #[error("{0}")]
    Injected(String),
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Sequential source of blocks for one (stream, partition)
///
/// A polled block is owned by the caller until handed back through
/// [`BlockLog::release`]. Blocks that are never released are read again the
/// next time the log is opened.
pub trait BlockLog: Send + Sync {
    fn stream(&self) -> &str;

    fn partition(&self) -> u32;

    /// Visit every block header in log order without decoding rows
    fn scan(&self, visitor: &mut dyn FnMut(&BlockHeader)) -> Result<(), LogError>;

    /// Next unread block, `None` at the end of the log
    fn poll(&mut self) -> Result<Option<Block>, LogError>;

    /// Acknowledge a fully consumed block
    fn release(&mut self, block: Block) -> Result<(), LogError>;
}
