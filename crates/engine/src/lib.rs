// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Decode engine: drives partition logs through decoders

mod backoff;
mod engine;
mod error;
mod handle;
mod orchestrator;
mod watchdog;

pub use backoff::Backoff;
pub use engine::{DecodeEngine, RunResult};
pub use error::{EngineError, OrchestratorError};
pub use handle::DecoderHandle;
pub use orchestrator::{Orchestrator, RecoveryPlan, Report, StitchPlan, PROGRESS_INTERVAL};
pub use watchdog::{TimeoutAction, WatchdogGuard, WatchdogTimer};
