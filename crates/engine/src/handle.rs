// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generation-tagged reference to the live decoder

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use xr_adapters::Decoder;

struct HandleState<D> {
    decoder: Option<Arc<D>>,
    generation: u64,
    closed: bool,
}

/// The decoder a run currently exports through.
///
/// Every replacement bumps the generation. Generation changes are published
/// on a watch channel so an attempt using a replaced decoder can be abandoned
/// without waiting for the old decoder to return.
pub struct DecoderHandle<D> {
    state: Mutex<HandleState<D>>,
    generation_tx: watch::Sender<u64>,
}

impl<D: Decoder> DecoderHandle<D> {
    pub fn new(decoder: Option<Arc<D>>) -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(HandleState {
                decoder,
                generation: 0,
                closed: false,
            }),
            generation_tx,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HandleState<D>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Option<Arc<D>> {
        self.lock().decoder.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_bound(&self) -> bool {
        self.lock().decoder.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }

    /// Install `decoder`, returning the one it replaces.
    ///
    /// A closed handle accepts nothing: the offered decoder is detached
    /// immediately and `None` returned.
    pub fn replace(&self, decoder: Option<Arc<D>>) -> Option<Arc<D>> {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            if let Some(decoder) = decoder {
                decoder.detach();
            }
            return None;
        }
        let old = std::mem::replace(&mut state.decoder, decoder);
        state.generation += 1;
        self.generation_tx.send_replace(state.generation);
        old
    }

    /// Close the handle and return the bound decoder for teardown
    pub fn close(&self) -> Option<Arc<D>> {
        let mut state = self.lock();
        state.closed = true;
        let old = state.decoder.take();
        if old.is_some() {
            state.generation += 1;
            self.generation_tx.send_replace(state.generation);
        }
        old
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
