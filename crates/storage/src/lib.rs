// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Partition block logs: the segment file format, directory discovery and
//! the [`BlockLog`] interface the decode engine reads through.

pub mod discovery;
pub mod log;
pub mod segment;
pub mod segment_log;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use discovery::{discover_stream, SegmentFile};
pub use log::{BlockLog, LogError};
pub use segment::{SegmentName, SegmentReader, SegmentWriter};
pub use segment_log::SegmentLog;

#[cfg(any(test, feature = "test-support"))]
pub use memory::{LogCall, MemoryLog};
