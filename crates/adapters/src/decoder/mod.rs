// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row decoders: the destination side of an export run

mod csv;
mod noop;

pub use csv::{CsvDecoder, CsvDecoderFactory, CsvOptions};
pub use noop::{NoOpDecoder, NoOpDecoderFactory};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DecoderCall, FakeDecoder, FakeDecoderFactory, FakeFailure};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use xr_core::{Row, RowSchema, Source};

/// Errors from decoder operations
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Soft failure: the engine retries the whole block
    #[error("decoder requested block restart (backoff: {backoff})")]
    Restart { backoff: bool },
    #[error("decoder was detached")]
    Detached,
    #[error("invalid sink configuration: {0}")]
    Config(String),
    #[error("decoder fault: {0}")]
    Fault(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stateful consumer of the rows of one source
///
/// Callbacks for a block arrive in order: `on_block_start` with the first
/// exported row, `process_row` for every exported row, and
/// `on_block_completion` with the last row seen. A block may be restarted, in
/// which case the sequence begins again with `on_block_start`.
#[async_trait]
pub trait Decoder: Send + Sync + 'static {
    fn source(&self) -> &Source;

    /// Bind to a new row schema
    fn bind_schema(&self, schema: Arc<RowSchema>);

    fn current_schema(&self) -> Option<Arc<RowSchema>>;

    async fn on_block_start(&self, row: &Row) -> Result<(), DecodeError>;

    async fn process_row(&self, row: &Row) -> Result<(), DecodeError>;

    async fn on_block_completion(&self, row: &Row) -> Result<(), DecodeError>;

    /// The engine no longer uses this instance. Calls still in flight may
    /// return [`DecodeError::Detached`].
    fn detach(&self);
}

/// Creates decoder instances for sources
pub trait DecoderFactory: Clone + Send + Sync + 'static {
    type Decoder: Decoder;

    fn create(&self, source: &Source) -> Result<Self::Decoder, DecodeError>;

    /// Release sink-wide resources once every run is over
    fn shutdown(&self) -> Result<(), DecodeError>;
}
