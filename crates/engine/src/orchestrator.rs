// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequencing of engine runs for recovery and replica stitching

use crate::engine::{DecodeEngine, RunResult};
use crate::error::{EngineError, OrchestratorError};
use crate::watchdog::WatchdogTimer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use xr_adapters::DecoderFactory;
use xr_core::{reconcile, ConfigError, DecodeConfig, Retention, SequenceTracker, Source};
use xr_storage::{discover_stream, SegmentLog};

/// How often a waiting orchestrator reports progress
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

/// Export whole partitions found in one directory
#[derive(Debug, Clone)]
pub struct RecoveryPlan {
    pub input: PathBuf,
    pub stream: String,
    /// Partitions to export; empty means every partition found
    pub partitions: Vec<u32>,
    /// Rows to skip at the start of each partition
    pub skips: BTreeMap<u32, u64>,
    pub nonce_prefix: Option<String>,
    pub retention: Retention,
}

/// Export one partition whose rows are spread across replica directories
#[derive(Debug, Clone)]
pub struct StitchPlan {
    /// Replica directories; a host's id is its position after duplicates
    /// are dropped
    pub inputs: Vec<PathBuf>,
    pub stream: String,
    pub partition: u32,
}

/// Aggregate of every run an orchestrated export started
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub planned_rows: u64,
    pub failures: usize,
    pub runs: Vec<RunResult>,
}

impl Report {
    pub fn rows_exported(&self) -> u64 {
        self.runs.iter().map(|r| r.rows_exported).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    fn record(&mut self, result: RunResult) {
        if !result.success {
            self.failures += 1;
        }
        self.runs.push(result);
    }
}

/// Starts engine runs on a bounded worker pool
pub struct Orchestrator<F> {
    factory: F,
    config: DecodeConfig,
    threads: usize,
    timer: WatchdogTimer,
    cancel: CancellationToken,
}

impl<F: DecoderFactory> Orchestrator<F> {
    /// Must be called within a tokio runtime; the watchdog driver starts here.
    pub fn new(factory: F, config: DecodeConfig, threads: usize) -> Self {
        Self {
            factory,
            config,
            threads: threads.max(1),
            timer: WatchdogTimer::spawn(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn engine(&self, log: SegmentLog, source: Source, config: DecodeConfig) -> DecodeEngine<SegmentLog, F> {
        DecodeEngine::new(log, self.factory.clone(), source, config, self.timer.clone())
            .with_cancellation(self.cancel.clone())
    }

    /// Scan every requested partition of `stream` under `input`
    pub fn scan(
        &self,
        input: &Path,
        stream: &str,
        partitions: &[u32],
    ) -> Result<BTreeMap<u32, SequenceTracker>, OrchestratorError> {
        let mut trackers = BTreeMap::new();
        for (partition, segments) in discover_partitions(input, stream, partitions)? {
            let log = SegmentLog::from_segments(stream, partition, segments, Retention::Keep);
            let source = Source::for_partition(stream, partition, None);
            let tracker = self.engine(log, source, DecodeConfig::scan()).scan()?;
            trackers.insert(partition, tracker);
        }
        Ok(trackers)
    }

    /// Export each requested partition, partitions running concurrently
    pub async fn recover(&self, plan: &RecoveryPlan) -> Result<Report, OrchestratorError> {
        let discovered = discover_partitions(&plan.input, &plan.stream, &plan.partitions)?;
        for partition in plan.skips.keys().filter(|p| !discovered.contains_key(p)) {
            tracing::warn!(partition, stream = %plan.stream, "ignoring skip for a partition that is not exported");
        }
        tracing::info!(
            stream = %plan.stream,
            input = %plan.input.display(),
            partitions = discovered.len(),
            "starting recovery"
        );

        let permits = Arc::new(Semaphore::new(self.threads));
        let mut tasks = JoinSet::new();
        for (partition, segments) in discovered {
            let log = SegmentLog::from_segments(&plan.stream, partition, segments, plan.retention);
            let source = Source::for_partition(&plan.stream, partition, plan.nonce_prefix.as_deref());
            let skip = plan.skips.get(&partition).copied().unwrap_or(0);
            let engine = self.engine(log, source, self.config.clone().with_skip(skip));
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                vec![engine.run().await]
            });
        }

        let mut report = Report::default();
        self.collect(tasks, &mut report).await;
        report.planned_rows = report.runs.iter().map(|r| r.scanned.size_in_sequence()).sum();
        Ok(report)
    }

    /// Scan every replica, split the sequence space between them, and export
    /// each host's share under its own nonce.
    pub async fn stitch(&self, plan: &StitchPlan) -> Result<Report, OrchestratorError> {
        let hosts = dedup_inputs(&plan.inputs)?;
        let trackers = self.scan_hosts(&hosts, plan);
        if trackers.is_empty() {
            return Err(OrchestratorError::NoTrackers {
                stream: plan.stream.clone(),
                partition: plan.partition,
            });
        }

        let assignments = reconcile(&trackers);
        let mut report = Report {
            planned_rows: assignments.values().map(SequenceTracker::size_in_sequence).sum(),
            ..Report::default()
        };
        tracing::info!(
            stream = %plan.stream,
            partition = plan.partition,
            hosts = trackers.len(),
            planned_rows = report.planned_rows,
            "reconciled replicas"
        );

        let permits = Arc::new(Semaphore::new(self.threads));
        let mut tasks = JoinSet::new();
        for (host, assigned) in assignments {
            let Some(dir) = hosts.get(host).cloned() else {
                continue;
            };
            if assigned.is_empty() {
                tracing::info!(host, dir = %dir.display(), "host has nothing to export");
                continue;
            }
            tracing::info!(host, dir = %dir.display(), ranges = %assigned, "host assignment");

            let runs: Vec<_> = assigned
                .ranges()
                .iter()
                .map(|range| {
                    let source = Source::for_range(&plan.stream, plan.partition, range.lo, range.hi);
                    (source, self.config.clone().with_range(*range))
                })
                .collect();
            let runner = HostRunner {
                factory: self.factory.clone(),
                timer: self.timer.clone(),
                cancel: self.cancel.clone(),
                dir,
                stream: plan.stream.clone(),
                partition: plan.partition,
            };
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                runner.run(runs).await
            });
        }

        self.collect(tasks, &mut report).await;
        Ok(report)
    }

    fn scan_hosts(&self, hosts: &[PathBuf], plan: &StitchPlan) -> BTreeMap<usize, SequenceTracker> {
        let mut trackers = BTreeMap::new();
        for (host, dir) in hosts.iter().enumerate() {
            let scanned = SegmentLog::open(dir, &plan.stream, plan.partition, Retention::Keep)
                .map_err(EngineError::from)
                .and_then(|log| {
                    let source = Source::for_partition(&plan.stream, plan.partition, None);
                    self.engine(log, source, DecodeConfig::scan()).scan()
                });
            match scanned {
                Ok(tracker) if tracker.is_empty() => {
                    tracing::warn!(host, dir = %dir.display(), "host has no data, leaving it out");
                }
                Ok(tracker) => {
                    tracing::info!(host, dir = %dir.display(), ranges = %tracker, "scanned host");
                    trackers.insert(host, tracker);
                }
                Err(error) => {
                    tracing::warn!(host, dir = %dir.display(), %error, "host scan failed, leaving it out");
                }
            }
        }
        trackers
    }

    async fn collect(&self, mut tasks: JoinSet<Vec<RunResult>>, report: &mut Report) {
        let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
        progress.tick().await;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(results)) => {
                        for result in results {
                            report.record(result);
                        }
                    }
                    Some(Err(error)) => {
                        tracing::error!(%error, "export task did not finish");
                        report.failures += 1;
                    }
                    None => break,
                },
                _ = progress.tick() => {
                    tracing::info!(
                        pending = tasks.len(),
                        rows_exported = report.rows_exported(),
                        planned_rows = report.planned_rows,
                        "waiting for export runs"
                    );
                }
            }
        }
    }

    /// Release sink resources. Failures are logged only.
    pub fn shutdown(self) {
        if let Err(error) = self.factory.shutdown() {
            tracing::warn!(%error, "decoder factory shutdown failed");
        }
    }
}

/// Sequential runs over one replica directory
struct HostRunner<F> {
    factory: F,
    timer: WatchdogTimer,
    cancel: CancellationToken,
    dir: PathBuf,
    stream: String,
    partition: u32,
}

impl<F: DecoderFactory> HostRunner<F> {
    async fn run(self, runs: Vec<(Source, DecodeConfig)>) -> Vec<RunResult> {
        let mut results = Vec::with_capacity(runs.len());
        for (source, config) in runs {
            if self.cancel.is_cancelled() {
                break;
            }
            // Every range rereads the log, so nothing may be reclaimed
            let log = match SegmentLog::open(&self.dir, &self.stream, self.partition, Retention::Keep) {
                Ok(log) => log,
                Err(error) => {
                    tracing::error!(%error, nonce = %source.nonce, "failed to open log");
                    let mut failed = RunResult::for_source(&source);
                    failed.fail(error);
                    results.push(failed);
                    continue;
                }
            };
            let engine = DecodeEngine::new(log, self.factory.clone(), source, config, self.timer.clone())
                .with_cancellation(self.cancel.clone());
            results.push(engine.run().await);
        }
        results
    }
}

fn discover_partitions(
    input: &Path,
    stream: &str,
    partitions: &[u32],
) -> Result<BTreeMap<u32, Vec<xr_storage::SegmentFile>>, OrchestratorError> {
    if !input.is_dir() {
        return Err(ConfigError::MissingDirectory(input.to_path_buf()).into());
    }
    let mut discovered = discover_stream(input, stream)?;
    if partitions.is_empty() {
        return Ok(discovered);
    }

    let mut selected = BTreeMap::new();
    for &partition in partitions {
        let segments = discovered.remove(&partition).ok_or_else(|| ConfigError::UnknownPartition {
            stream: stream.to_string(),
            partition,
        })?;
        selected.insert(partition, segments);
    }
    Ok(selected)
}

fn dedup_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, OrchestratorError> {
    if inputs.is_empty() {
        return Err(ConfigError::NoInput.into());
    }
    let mut hosts: Vec<PathBuf> = Vec::with_capacity(inputs.len());
    for input in inputs {
        if hosts.contains(input) {
            tracing::warn!(dir = %input.display(), "duplicate input directory ignored");
            continue;
        }
        if !input.is_dir() {
            return Err(ConfigError::MissingDirectory(input.clone()).into());
        }
        hosts.push(input.clone());
    }
    Ok(hosts)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
