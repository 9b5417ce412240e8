// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Row decoders: the sinks rows are exported to

pub mod decoder;
pub mod traced;

pub use decoder::{
    CsvDecoder, CsvDecoderFactory, CsvOptions, DecodeError, Decoder, DecoderFactory, NoOpDecoder,
    NoOpDecoderFactory,
};
pub use traced::{TracedDecoder, TracedDecoderFactory};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use decoder::{DecoderCall, FakeDecoder, FakeDecoderFactory, FakeFailure};
