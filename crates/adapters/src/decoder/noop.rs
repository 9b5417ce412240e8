// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoder that discards rows

use super::{DecodeError, Decoder, DecoderFactory};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use xr_core::{Row, RowSchema, Source};

/// Counts rows and writes nothing
pub struct NoOpDecoder {
    source: Source,
    schema: Mutex<Option<Arc<RowSchema>>>,
    rows: Arc<AtomicU64>,
}

#[async_trait]
impl Decoder for NoOpDecoder {
    fn source(&self) -> &Source {
        &self.source
    }

    fn bind_schema(&self, schema: Arc<RowSchema>) {
        *self.schema.lock().unwrap_or_else(|e| e.into_inner()) = Some(schema);
    }

    fn current_schema(&self) -> Option<Arc<RowSchema>> {
        self.schema.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn on_block_start(&self, _row: &Row) -> Result<(), DecodeError> {
        Ok(())
    }

    async fn process_row(&self, _row: &Row) -> Result<(), DecodeError> {
        self.rows.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn on_block_completion(&self, _row: &Row) -> Result<(), DecodeError> {
        Ok(())
    }

    fn detach(&self) {}
}

/// Creates [`NoOpDecoder`]s sharing one row counter
#[derive(Clone, Default)]
pub struct NoOpDecoderFactory {
    rows: Arc<AtomicU64>,
}

impl NoOpDecoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows seen by every decoder this factory created
    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }
}

impl DecoderFactory for NoOpDecoderFactory {
    type Decoder = NoOpDecoder;

    fn create(&self, source: &Source) -> Result<NoOpDecoder, DecodeError> {
        Ok(NoOpDecoder {
            source: source.clone(),
            schema: Mutex::new(None),
            rows: Arc::clone(&self.rows),
        })
    }

    fn shutdown(&self) -> Result<(), DecodeError> {
        tracing::debug!(rows = self.rows(), "no-op sink shut down");
        Ok(())
    }
}
