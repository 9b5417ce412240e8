// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use xr_core::SequenceTracker;
use xr_engine::{Report, RunResult};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Run report, one line per run then a total
#[derive(Serialize)]
#[serde(transparent)]
pub struct ReportView<'a>(pub &'a Report);

fn status(run: &RunResult) -> String {
    match (&run.error, run.complete) {
        (Some(error), _) => format!("failed: {error}"),
        (None, true) => "complete".to_string(),
        (None, false) => "incomplete".to_string(),
    }
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<&RunResult> = self.0.runs.iter().collect();
        runs.sort_by(|a, b| (a.partition, a.tracker.first_seq(), &a.nonce).cmp(&(b.partition, b.tracker.first_seq(), &b.nonce)));

        writeln!(f, "{:<32} {:>10}  STATUS", "RUN", "ROWS")?;
        for run in runs {
            writeln!(f, "{:<32} {:>10}  {}", run.nonce, run.rows_exported, status(run))?;
        }
        write!(
            f,
            "exported {} of {} planned rows, {} failed",
            self.0.rows_exported(),
            self.0.planned_rows,
            self.0.failures
        )
    }
}

/// Scanned ranges per partition
#[derive(Serialize)]
pub struct ScanView<'a> {
    pub stream: &'a str,
    pub partitions: &'a BTreeMap<u32, SequenceTracker>,
}

impl fmt::Display for ScanView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.partitions.is_empty() {
            return write!(f, "no partitions found for {}", self.stream);
        }
        let mut lines = self.partitions.iter().peekable();
        while let Some((partition, tracker)) = lines.next() {
            write!(
                f,
                "partition {partition}: {tracker} ({} rows)",
                tracker.size_in_sequence()
            )?;
            if lines.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
