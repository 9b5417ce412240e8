// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable decoder for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DecodeError, Decoder, DecoderFactory};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use xr_core::{Row, RowSchema, Source};

/// Recorded decoder call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderCall {
    Create { instance: u64, nonce: String },
    BindSchema { instance: u64, generation: u64 },
    BlockStart { instance: u64, seq: u64 },
    Row { instance: u64, seq: u64 },
    BlockCompletion { instance: u64, seq: u64 },
    Detach { instance: u64 },
}

/// Scripted outcome of a `process_row` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    Restart { backoff: bool },
    Fault,
    /// Never return until the decoder is detached
    Hang,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<DecoderCall>,
    row_failures: HashMap<u64, VecDeque<FakeFailure>>,
    schema_drifts: HashSet<u64>,
    create_failures: u32,
    shutdown_fails: bool,
    shutdowns: u32,
    committed: Vec<u64>,
    next_instance: u64,
}

/// Fake decoder factory; every decoder it creates shares its script and log
#[derive(Clone, Default)]
pub struct FakeDecoderFactory {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDecoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `process_row` of `seq` fail with `failure`. Failures
    /// queued for the same sequence are consumed in order.
    pub fn fail_row(&self, seq: u64, failure: FakeFailure) {
        self.lock()
            .row_failures
            .entry(seq)
            .or_default()
            .push_back(failure);
    }

    /// After `process_row` of `seq` succeeds, the decoder reports a schema
    /// generation other than the one it was bound to
    pub fn drift_schema_after(&self, seq: u64) {
        self.lock().schema_drifts.insert(seq);
    }

    /// Make the next `n` calls to `create` fail
    pub fn fail_creates(&self, n: u32) {
        self.lock().create_failures = n;
    }

    pub fn fail_shutdown(&self) {
        self.lock().shutdown_fails = true;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DecoderCall> {
        self.lock().calls.clone()
    }

    /// Sequences of rows whose block completed on a live decoder
    pub fn committed_rows(&self) -> Vec<u64> {
        self.lock().committed.clone()
    }

    pub fn instances(&self) -> u64 {
        self.lock().next_instance
    }

    pub fn detach_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DecoderCall::Detach { .. }))
            .count()
    }

    pub fn shutdowns(&self) -> u32 {
        self.lock().shutdowns
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DecoderFactory for FakeDecoderFactory {
    type Decoder = FakeDecoder;

    fn create(&self, source: &Source) -> Result<FakeDecoder, DecodeError> {
        let mut state = self.lock();
        if state.create_failures > 0 {
            state.create_failures -= 1;
            return Err(DecodeError::Fault("injected create failure".to_string()));
        }
        let instance = state.next_instance;
        state.next_instance += 1;
        state.calls.push(DecoderCall::Create {
            instance,
            nonce: source.nonce.clone(),
        });

        let (detached, _) = watch::channel(false);
        Ok(FakeDecoder {
            instance,
            source: source.clone(),
            shared: Arc::clone(&self.state),
            schema: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            detached,
        })
    }

    fn shutdown(&self) -> Result<(), DecodeError> {
        let mut state = self.lock();
        state.shutdowns += 1;
        if state.shutdown_fails {
            return Err(DecodeError::Fault("injected shutdown failure".to_string()));
        }
        Ok(())
    }
}

/// Decoder driven by its factory's script
pub struct FakeDecoder {
    instance: u64,
    source: Source,
    shared: Arc<Mutex<FakeState>>,
    schema: Mutex<Option<Arc<RowSchema>>>,
    /// Rows processed in the current block attempt
    pending: Mutex<Vec<u64>>,
    detached: watch::Sender<bool>,
}

impl FakeDecoder {
    pub fn instance(&self) -> u64 {
        self.instance
    }

    fn record(&self, call: DecoderCall) {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .push(call);
    }

    fn is_detached(&self) -> bool {
        *self.detached.borrow()
    }

    fn next_failure(&self, seq: u64) -> Option<FakeFailure> {
        let mut state = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        state.row_failures.get_mut(&seq).and_then(VecDeque::pop_front)
    }

    fn take_drift(&self, seq: u64) -> bool {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .schema_drifts
            .remove(&seq)
    }
}

#[async_trait]
impl Decoder for FakeDecoder {
    fn source(&self) -> &Source {
        &self.source
    }

    fn bind_schema(&self, schema: Arc<RowSchema>) {
        self.record(DecoderCall::BindSchema {
            instance: self.instance,
            generation: schema.generation,
        });
        *self.schema.lock().unwrap_or_else(|e| e.into_inner()) = Some(schema);
    }

    fn current_schema(&self) -> Option<Arc<RowSchema>> {
        self.schema.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn on_block_start(&self, row: &Row) -> Result<(), DecodeError> {
        if self.is_detached() {
            return Err(DecodeError::Detached);
        }
        self.record(DecoderCall::BlockStart {
            instance: self.instance,
            seq: row.seq,
        });
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }

    async fn process_row(&self, row: &Row) -> Result<(), DecodeError> {
        if self.is_detached() {
            return Err(DecodeError::Detached);
        }
        self.record(DecoderCall::Row {
            instance: self.instance,
            seq: row.seq,
        });

        match self.next_failure(row.seq) {
            None => {
                self.pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(row.seq);
                if self.take_drift(row.seq) {
                    let mut schema = self.schema.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(bound) = schema.as_ref() {
                        let mut drifted = RowSchema::clone(bound);
                        drifted.generation += 1;
                        *schema = Some(Arc::new(drifted));
                    }
                }
                Ok(())
            }
            Some(FakeFailure::Restart { backoff }) => Err(DecodeError::Restart { backoff }),
            Some(FakeFailure::Fault) => Err(DecodeError::Fault(format!("injected fault at {}", row.seq))),
            Some(FakeFailure::Hang) => {
                let mut detached = self.detached.subscribe();
                let _ = detached.wait_for(|d| *d).await;
                Err(DecodeError::Detached)
            }
        }
    }

    async fn on_block_completion(&self, row: &Row) -> Result<(), DecodeError> {
        if self.is_detached() {
            return Err(DecodeError::Detached);
        }
        self.record(DecoderCall::BlockCompletion {
            instance: self.instance,
            seq: row.seq,
        });
        let rows: Vec<u64> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .committed
            .extend(rows);
        Ok(())
    }

    fn detach(&self) {
        self.detached.send_replace(true);
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.record(DecoderCall::Detach {
            instance: self.instance,
        });
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
