// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-driver timer for block watchdogs
//!
//! Every engine run arms one deadline per block attempt and cancels it when
//! the attempt ends. All deadlines share one driver task holding a min-heap;
//! cancelled entries are dropped lazily when they reach the top.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Work to run when a deadline passes
pub type TimeoutAction = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Arm {
        id: u64,
        deadline: Instant,
        action: TimeoutAction,
    },
    Cancel {
        id: u64,
    },
}

/// Handle to the timer driver. Clones share the driver.
#[derive(Clone)]
pub struct WatchdogTimer {
    tx: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl WatchdogTimer {
    /// Start the driver on the current tokio runtime.
    ///
    /// The driver exits once the timer and every guard are dropped.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(rx));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `action` once `after` elapses unless the guard is dropped first
    pub fn arm<A>(&self, after: Duration, action: A) -> WatchdogGuard
    where
        A: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let command = Command::Arm {
            id,
            deadline: Instant::now() + after,
            action: Box::new(action),
        };
        if self.tx.send(command).is_err() {
            tracing::warn!(id, "watchdog driver gone, deadline not armed");
        }
        WatchdogGuard {
            id,
            tx: self.tx.clone(),
        }
    }
}

/// Cancels its deadline when dropped
pub struct WatchdogGuard {
    id: u64,
    tx: mpsc::UnboundedSender<Command>,
}

impl WatchdogGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for WatchdogGuard {
    fn drop(&mut self) {
        // Driver already gone means nothing can fire
        let _ = self.tx.send(Command::Cancel { id: self.id });
    }
}

async fn drive(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    let mut actions: HashMap<u64, TimeoutAction> = HashMap::new();

    loop {
        while let Some(Reverse((_, id))) = deadlines.peek() {
            if actions.contains_key(id) {
                break;
            }
            deadlines.pop();
        }
        let next = deadlines.peek().map(|Reverse((deadline, _))| *deadline);

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Arm { id, deadline, action }) => {
                    deadlines.push(Reverse((deadline, id)));
                    actions.insert(id, action);
                }
                Some(Command::Cancel { id }) => {
                    actions.remove(&id);
                }
                None => break,
            },
            _ = tokio::time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                if let Some(Reverse((_, id))) = deadlines.pop() {
                    if let Some(action) = actions.remove(&id) {
                        tracing::debug!(id, "watchdog deadline passed");
                        action();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
