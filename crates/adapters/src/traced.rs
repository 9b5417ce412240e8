// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced decoder wrappers for consistent observability

use crate::decoder::{DecodeError, Decoder, DecoderFactory};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use xr_core::{Row, RowSchema, Source};

/// Wrapper that adds tracing to any DecoderFactory
#[derive(Clone)]
pub struct TracedDecoderFactory<F> {
    inner: F,
}

impl<F> TracedDecoderFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: DecoderFactory> DecoderFactory for TracedDecoderFactory<F> {
    type Decoder = TracedDecoder<F::Decoder>;

    fn create(&self, source: &Source) -> Result<Self::Decoder, DecodeError> {
        let span = tracing::info_span!("decoder.create", nonce = %source.nonce);
        let _guard = span.enter();

        match self.inner.create(source) {
            Ok(decoder) => {
                tracing::debug!("decoder created");
                Ok(TracedDecoder::new(decoder))
            }
            Err(e) => {
                tracing::error!(error = %e, "create failed");
                Err(e)
            }
        }
    }

    fn shutdown(&self) -> Result<(), DecodeError> {
        let result = self.inner.shutdown();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "decoder factory shutdown failed");
        }
        result
    }
}

/// Wrapper that adds tracing to any Decoder
pub struct TracedDecoder<D> {
    inner: D,
    block_started: std::sync::Mutex<Option<Instant>>,
    block_rows: AtomicU64,
}

impl<D> TracedDecoder<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            block_started: std::sync::Mutex::new(None),
            block_rows: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl<D: Decoder> Decoder for TracedDecoder<D> {
    fn source(&self) -> &Source {
        self.inner.source()
    }

    fn bind_schema(&self, schema: Arc<RowSchema>) {
        tracing::info!(
            nonce = %self.inner.source().nonce,
            generation = schema.generation,
            columns = schema.columns.len(),
            "binding schema"
        );
        self.inner.bind_schema(schema);
    }

    fn current_schema(&self) -> Option<Arc<RowSchema>> {
        self.inner.current_schema()
    }

    async fn on_block_start(&self, row: &Row) -> Result<(), DecodeError> {
        *self.block_started.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        self.block_rows.store(0, Ordering::Relaxed);
        tracing::debug!(nonce = %self.inner.source().nonce, seq = row.seq, "block start");
        self.inner.on_block_start(row).await
    }

    async fn process_row(&self, row: &Row) -> Result<(), DecodeError> {
        let result = self.inner.process_row(row).await;
        match &result {
            Ok(()) => {
                self.block_rows.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => tracing::warn!(seq = row.seq, error = %e, "row rejected"),
        }
        result
    }

    async fn on_block_completion(&self, row: &Row) -> Result<(), DecodeError> {
        let span = tracing::info_span!("decoder.complete", nonce = %self.inner.source().nonce, seq = row.seq);
        let result = self.inner.on_block_completion(row).instrument(span.clone()).await;
        let _guard = span.enter();
        let elapsed_ms = self
            .block_started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .map(|t| t.elapsed().as_millis() as u64);
        match &result {
            Ok(()) => tracing::debug!(
                rows = self.block_rows.load(Ordering::Relaxed),
                elapsed_ms,
                "block completed"
            ),
            Err(e) => tracing::error!(error = %e, "block completion failed"),
        }
        result
    }

    fn detach(&self) {
        tracing::info!(nonce = %self.inner.source().nonce, "detaching decoder");
        self.inner.detach();
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
