// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jittered exponential backoff between block attempts

use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use xr_core::{Clock, LogThrottle, SystemClock};

/// Bounds of the first delay, in milliseconds
const INITIAL_MIN_MS: f64 = 10.0;
const INITIAL_MAX_MS: f64 = 20.0;

/// Delay sequence for retrying one block.
///
/// Each step grows the delay by half, then adds up to half of the grown value
/// again as jitter. The delay never exceeds the cap and never shrinks.
pub struct Backoff<C: Clock = SystemClock> {
    current: Duration,
    cap: Duration,
    rng: StdRng,
    cap_log: LogThrottle<C>,
}

impl<C: Clock> Backoff<C> {
    pub fn new(cap: Duration, mut rng: StdRng, cap_log: LogThrottle<C>) -> Self {
        let initial_ms = rng.gen_range(INITIAL_MIN_MS..INITIAL_MAX_MS);
        Self {
            current: Duration::from_secs_f64(initial_ms / 1000.0).min(cap),
            cap,
            rng,
            cap_log,
        }
    }

    /// Delay the next sleep would use
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn at_cap(&self) -> bool {
        self.current >= self.cap
    }

    /// Take the delay to sleep now and grow the following one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        if self.at_cap() {
            if let Some(suppressed) = self.cap_log.permit() {
                tracing::info!(
                    cap_ms = self.cap.as_millis() as u64,
                    suppressed,
                    "block retries hit maximum backoff"
                );
            }
            return delay;
        }

        let mut next = delay.as_secs_f64();
        next += next * 0.5;
        next += next * 0.5 * self.rng.gen::<f64>();
        self.current = Duration::from_secs_f64(next).min(self.cap);
        tracing::debug!(delay_ms = delay.as_millis() as u64, "backing off");
        delay
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
