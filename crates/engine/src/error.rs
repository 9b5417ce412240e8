// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the decode engine and orchestrator

use thiserror::Error;
use xr_adapters::DecodeError;
use xr_core::{BlockError, ConfigError, RowError};
use xr_storage::LogError;

/// Errors that end one engine run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("decoder failed at seq {seq}: {source}")]
    Decode {
        seq: u64,
        #[source]
        source: DecodeError,
    },
    #[error("row {seq} failed to decode: {source}")]
    Row {
        seq: u64,
        #[source]
        source: RowError,
    },
    #[error("block starting at {start_seq} is malformed: {source}")]
    Block {
        start_seq: u64,
        #[source]
        source: BlockError,
    },
    #[error("schema changed mid-block at seq {seq}: decoder bound to {bound:?}, block has generation {block}")]
    SchemaChangedMidBlock {
        seq: u64,
        bound: Option<u64>,
        block: u64,
    },
}

/// Errors that prevent an orchestrated run from starting
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("no host holds data for {stream} partition {partition}")]
    NoTrackers { stream: String, partition: u32 },
}
