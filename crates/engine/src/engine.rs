// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decode loop for one (stream, partition) log
//!
//! A run scans the log, then polls blocks and feeds their rows through the
//! bound decoder. A block is released only once every row in it was handled.
//! Each block attempt is guarded by a watchdog that swaps in a fresh decoder
//! when the attempt stalls.

use crate::backoff::Backoff;
use crate::error::EngineError;
use crate::handle::DecoderHandle;
use crate::watchdog::{WatchdogGuard, WatchdogTimer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use xr_adapters::{DecodeError, Decoder, DecoderFactory};
use xr_core::{Block, DecodeConfig, LogThrottle, Row, SequenceTracker, Source};
use xr_storage::BlockLog;

/// Minimum spacing of "maximum backoff" log lines
const BACKOFF_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one engine run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub stream: String,
    pub partition: u32,
    pub nonce: String,
    /// False when the run stopped on a genuine fault
    pub success: bool,
    /// The log was walked to its end
    pub complete: bool,
    /// Ranges of the blocks fully processed and released. Scan-only runs
    /// report the scanned ranges.
    pub tracker: SequenceTracker,
    /// Ranges found by the scan phase
    pub scanned: SequenceTracker,
    pub rows_exported: u64,
    pub rows_skipped: u64,
    pub rows_processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub(crate) fn for_source(source: &Source) -> Self {
        Self {
            stream: source.stream.clone(),
            partition: source.partition,
            nonce: source.nonce.clone(),
            success: true,
            complete: false,
            tracker: SequenceTracker::new(),
            scanned: SequenceTracker::new(),
            rows_exported: 0,
            rows_skipped: 0,
            rows_processed: 0,
            error: None,
        }
    }

    pub(crate) fn fail(&mut self, error: impl std::fmt::Display) {
        self.success = false;
        self.error = Some(error.to_string());
    }
}

/// Per-run row accounting. Attempts work on a copy that is kept only when
/// the attempt succeeds.
#[derive(Debug, Clone, Copy)]
struct Window {
    skip_remaining: u64,
    exported: u64,
    skipped: u64,
    processed: u64,
}

enum BlockOutcome {
    /// Every row handled; the block may be released
    Processed,
    /// Stopped inside the block; it stays unreleased
    Partial,
    Cancelled,
}

enum AttemptError {
    Restart { backoff: bool },
    Unavailable,
    /// The decoder was replaced while the attempt was running
    Superseded,
    Fault(EngineError),
}

impl AttemptError {
    fn decode(seq: u64, error: DecodeError) -> Self {
        match error {
            DecodeError::Restart { backoff } => Self::Restart { backoff },
            source => Self::Fault(EngineError::Decode { seq, source }),
        }
    }
}

/// State shared between a run and its watchdog callbacks
struct Shared<F: DecoderFactory> {
    factory: F,
    source: Source,
    handle: DecoderHandle<F::Decoder>,
    attempt_id: AtomicU64,
}

impl<F: DecoderFactory> Shared<F> {
    fn new(factory: F, source: Source) -> Self {
        let decoder = create_decoder(&factory, &source);
        Self {
            factory,
            source,
            handle: DecoderHandle::new(decoder),
            attempt_id: AtomicU64::new(0),
        }
    }

    fn on_block_timeout(&self, attempt: u64, start_seq: u64) {
        if self.attempt_id.load(Ordering::SeqCst) != attempt {
            tracing::warn!(start_seq, attempt, "spurious block timeout");
            return;
        }
        tracing::warn!(start_seq, attempt, "block timed out, replacing decoder");
        let fresh = create_decoder(&self.factory, &self.source);
        if let Some(old) = self.handle.replace(fresh) {
            old.detach();
        }
    }

    fn bind_if_missing(&self) {
        if self.handle.is_bound() {
            return;
        }
        if let Some(fresh) = create_decoder(&self.factory, &self.source) {
            tracing::info!("bound fresh decoder");
            if let Some(old) = self.handle.replace(Some(fresh)) {
                old.detach();
            }
        }
    }

    fn close(&self) -> Option<Arc<F::Decoder>> {
        self.attempt_id.fetch_add(1, Ordering::SeqCst);
        self.handle.close()
    }
}

fn create_decoder<F: DecoderFactory>(factory: &F, source: &Source) -> Option<Arc<F::Decoder>> {
    match factory.create(source) {
        Ok(decoder) => Some(Arc::new(decoder)),
        Err(error) => {
            tracing::warn!(%error, nonce = %source.nonce, "failed to create decoder");
            None
        }
    }
}

/// Drives one partition log through a decoder
pub struct DecodeEngine<L, F> {
    log: L,
    factory: F,
    source: Source,
    config: DecodeConfig,
    timer: WatchdogTimer,
    cancel: CancellationToken,
    rng: StdRng,
    cap_log: LogThrottle,
}

impl<L: BlockLog, F: DecoderFactory> DecodeEngine<L, F> {
    pub fn new(log: L, factory: F, source: Source, config: DecodeConfig, timer: WatchdogTimer) -> Self {
        Self {
            log,
            factory,
            source,
            config,
            timer,
            cancel: CancellationToken::new(),
            rng: StdRng::from_entropy(),
            cap_log: LogThrottle::system(BACKOFF_LOG_INTERVAL),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Make backoff jitter reproducible
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Sequence ranges of every non-empty block, without decoding rows
    pub fn scan(&self) -> Result<SequenceTracker, EngineError> {
        let mut tracker = SequenceTracker::new();
        let mut blocks = 0u64;
        self.log.scan(&mut |header| {
            blocks += 1;
            if let Some(range) = header.seq_range() {
                tracker.add_range(range.lo, range.hi);
            }
        })?;
        tracing::debug!(blocks, %tracker, "scanned block headers");
        Ok(tracker)
    }

    /// Scan, then export until the log is drained, the run is cancelled,
    /// the row quota is met, or a genuine fault occurs.
    pub async fn run(mut self) -> RunResult {
        let span = tracing::info_span!(
            "engine",
            stream = %self.source.stream,
            partition = self.source.partition,
            nonce = %self.source.nonce,
        );
        async move { self.execute().await }.instrument(span).await
    }

    async fn execute(&mut self) -> RunResult {
        let mut result = RunResult::for_source(&self.source);

        let scanned = match self.scan() {
            Ok(tracker) => tracker,
            Err(error) => {
                tracing::error!(%error, "scan failed");
                result.fail(error);
                return result;
            }
        };
        tracing::info!(rows = scanned.size_in_sequence(), ranges = %scanned, "scanned log");
        result.scanned = scanned.clone();

        if self.config.scan_only {
            result.tracker = scanned;
            result.complete = true;
            return result;
        }

        let shared = Arc::new(Shared::new(self.factory.clone(), self.source.clone()));
        let mut window = Window {
            skip_remaining: self.config.skip,
            exported: 0,
            skipped: 0,
            processed: 0,
        };
        let drained = self.drain(&shared, &mut window, &mut result.tracker).await;

        if let Some(decoder) = shared.close() {
            decoder.detach();
        }

        result.rows_exported = window.exported;
        result.rows_skipped = window.skipped;
        result.rows_processed = window.processed;
        match drained {
            Ok(complete) => {
                result.complete = complete;
                tracing::info!(
                    rows_exported = window.exported,
                    released = %result.tracker,
                    "export {}",
                    if complete { "complete" } else { "incomplete" }
                );
            }
            Err(error) => {
                tracing::error!(%error, rows_exported = window.exported, "export failed");
                result.fail(error);
            }
        }
        result
    }

    /// Poll and process blocks; `Ok(true)` once the log is exhausted
    async fn drain(
        &mut self,
        shared: &Arc<Shared<F>>,
        window: &mut Window,
        released: &mut SequenceTracker,
    ) -> Result<bool, EngineError> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("run cancelled");
                return Ok(false);
            }
            if window.exported >= self.config.count {
                tracing::info!(count = self.config.count, "row quota reached");
                return Ok(false);
            }

            let Some(block) = self.log.poll()? else {
                return Ok(true);
            };
            let backoff = Backoff::new(
                self.config.backoff_cap,
                StdRng::seed_from_u64(self.rng.gen()),
                self.cap_log.clone(),
            );

            match self.process_block(shared, &block, window, backoff).await? {
                BlockOutcome::Processed => {
                    let range = block.header.seq_range();
                    self.log.release(block)?;
                    if let Some(range) = range {
                        released.add_range(range.lo, range.hi);
                    }
                }
                BlockOutcome::Partial => {
                    tracing::debug!(start_seq = block.start_seq(), "block not fully processed, stopping");
                    return Ok(false);
                }
                BlockOutcome::Cancelled => {
                    tracing::info!(start_seq = block.start_seq(), "run cancelled mid-block");
                    return Ok(false);
                }
            }
        }
    }

    async fn process_block(
        &self,
        shared: &Arc<Shared<F>>,
        block: &Block,
        window: &mut Window,
        mut backoff: Backoff,
    ) -> Result<BlockOutcome, EngineError> {
        if block.is_empty() {
            return Ok(BlockOutcome::Processed);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Ok(BlockOutcome::Cancelled);
            }

            let attempt = shared.attempt_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut generation_rx = shared.handle.subscribe();
            let generation = *generation_rx.borrow_and_update();
            let watchdog = self.arm_watchdog(shared, attempt, block.start_seq());

            let mut trial = *window;
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(BlockOutcome::Cancelled),
                _ = generation_rx.wait_for(|g| *g != generation) => Err(AttemptError::Superseded),
                outcome = self.attempt(shared, block, &mut trial) => outcome,
            };
            drop(watchdog);

            let delay = match outcome {
                Ok(fully) => {
                    *window = trial;
                    return Ok(if fully {
                        BlockOutcome::Processed
                    } else {
                        BlockOutcome::Partial
                    });
                }
                Err(AttemptError::Restart { backoff: wants }) => {
                    tracing::debug!(start_seq = block.start_seq(), attempt, "decoder requested block restart");
                    wants.then(|| backoff.next_delay())
                }
                Err(AttemptError::Unavailable) => {
                    tracing::warn!(start_seq = block.start_seq(), "no decoder bound, retrying block");
                    Some(backoff.next_delay())
                }
                Err(AttemptError::Superseded) => {
                    tracing::warn!(start_seq = block.start_seq(), "decoder replaced during attempt, retrying block");
                    Some(backoff.next_delay())
                }
                Err(AttemptError::Fault(error)) => {
                    if shared.handle.generation() == generation {
                        return Err(error);
                    }
                    tracing::warn!(%error, start_seq = block.start_seq(), "attempt failed on a replaced decoder, retrying block");
                    Some(backoff.next_delay())
                }
            };

            if let Some(delay) = delay {
                if !self.pause(delay).await {
                    return Ok(BlockOutcome::Cancelled);
                }
            }
            shared.bind_if_missing();
        }
    }

    /// One pass over the block's rows; `Ok(true)` when the last row was handled
    async fn attempt(&self, shared: &Shared<F>, block: &Block, window: &mut Window) -> Result<bool, AttemptError> {
        let decoder = shared.handle.current().ok_or(AttemptError::Unavailable)?;
        let range = self.config.range;
        let start_seq = block.start_seq();
        let schema_generation = block.schema.generation;

        let mut last_handled = None;
        let mut last_exported: Option<Row> = None;

        for (index, record) in block.records().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let seq = start_seq.saturating_add(index as u64);
            let record = record.map_err(|source| AttemptError::Fault(EngineError::Block { start_seq, source }))?;

            let bound = decoder.current_schema().map(|schema| schema.generation);
            if bound != Some(schema_generation) {
                if index > 0 {
                    return Err(AttemptError::Fault(EngineError::SchemaChangedMidBlock {
                        seq,
                        bound,
                        block: schema_generation,
                    }));
                }
                decoder.bind_schema(Arc::clone(&block.schema));
            }

            if seq < range.lo {
                if self.config.decode_skipped {
                    self.decode(block, seq, record)?;
                }
                window.processed += 1;
                last_handled = Some(seq);
                continue;
            }
            if seq > range.hi || window.exported >= self.config.count {
                break;
            }

            let row = self.decode(block, seq, record)?;
            window.processed += 1;
            last_handled = Some(seq);
            if window.skip_remaining > 0 {
                window.skip_remaining -= 1;
                window.skipped += 1;
                continue;
            }

            if last_exported.is_none() {
                decoder
                    .on_block_start(&row)
                    .await
                    .map_err(|e| AttemptError::decode(seq, e))?;
            }
            decoder
                .process_row(&row)
                .await
                .map_err(|e| AttemptError::decode(seq, e))?;
            window.exported += 1;
            last_exported = Some(row);
        }

        if let Some(row) = &last_exported {
            decoder
                .on_block_completion(row)
                .await
                .map_err(|e| AttemptError::decode(row.seq, e))?;
        }
        Ok(last_handled == Some(block.last_seq()))
    }

    fn decode(&self, block: &Block, seq: u64, record: &[u8]) -> Result<Row, AttemptError> {
        Row::decode(&block.schema, self.source.partition, seq, record)
            .map_err(|source| AttemptError::Fault(EngineError::Row { seq, source }))
    }

    fn arm_watchdog(&self, shared: &Arc<Shared<F>>, attempt: u64, start_seq: u64) -> WatchdogGuard {
        let shared = Arc::clone(shared);
        let span = tracing::Span::current();
        self.timer.arm(self.config.block_timeout, move || {
            let _entered = span.enter();
            shared.on_block_timeout(attempt, start_seq);
        })
    }

    /// Sleep unless cancelled first; false on cancellation
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
