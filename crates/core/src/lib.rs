// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! xr-core: data model for export log recovery
//!
//! This crate provides:
//! - Sequence coverage tracking and replica reconciliation
//! - The block, row and schema codecs of the export log
//! - Run configuration types

pub mod block;
pub mod clock;
pub mod config;
pub mod reconcile;
pub mod row;
pub mod schema;
pub mod source;
pub mod tracker;

pub use block::{encode_block, Block, BlockError, BlockHeader, ReleaseToken, HEADER_SIZE};
pub use clock::{Clock, FakeClock, LogThrottle, SystemClock};
pub use config::{ConfigError, DecodeConfig, EngineSettings, Retention, SinkSettings, XrConfig};
pub use reconcile::reconcile;
pub use row::{encode_row, Row, RowError, Value};
pub use schema::{Column, ColumnType, RowSchema};
pub use source::Source;
pub use tracker::{SeqRange, SequenceTracker, FIRST_SEQ, INFINITE};
