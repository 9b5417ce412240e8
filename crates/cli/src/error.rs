// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing error display with context and suggestions.

use std::fmt;
use std::path::Path;
use xr_core::ConfigError;
use xr_engine::OrchestratorError;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct XrError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl XrError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn missing_outdir() -> Self {
        XrError::new("no output directory for the csv sink")
            .with_suggestion("Pass --outdir <DIR>")
            .with_suggestion("Or set `outdir` in the [sink] table of the config file")
            .with_suggestion("Use --sink none to decode without writing")
    }

    pub fn missing_directory(dir: &Path) -> Self {
        XrError::new(format!("input directory '{}' does not exist", dir.display()))
            .with_suggestion("Check the --input path")
    }

    pub fn unknown_partition(stream: &str, partition: u32) -> Self {
        XrError::new(format!("partition {partition} of stream '{stream}' not found"))
            .with_context("No segment file for this partition exists in the input directory")
            .with_suggestion(format!("List available partitions: xr scan --input <DIR> --stream {stream}"))
    }

    pub fn no_data(stream: &str, partition: u32) -> Self {
        XrError::new(format!("no input directory holds rows for '{stream}' partition {partition}"))
            .with_context("Every host scan failed or found an empty log")
            .with_suggestion("Check the stream name and partition")
            .with_suggestion("Run with RUST_LOG=debug to see why hosts were left out")
    }

    pub fn failed_runs(failed: usize, total: usize) -> Self {
        XrError::new(format!("{failed} of {total} export runs failed"))
            .with_context("Blocks of a failed run stay in the log and are exported again by the next run")
            .with_suggestion("Rerun the same command once the cause is fixed")
    }

    /// Friendlier rendering for the errors users hit most
    pub fn from_orchestrator(error: &OrchestratorError) -> Option<Self> {
        match error {
            OrchestratorError::Config(ConfigError::MissingDirectory(dir)) => Some(Self::missing_directory(dir)),
            OrchestratorError::Config(ConfigError::UnknownPartition { stream, partition }) => {
                Some(Self::unknown_partition(stream, *partition))
            }
            OrchestratorError::NoTrackers { stream, partition } => Some(Self::no_data(stream, *partition)),
            _ => None,
        }
    }
}

impl fmt::Display for XrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for XrError {}

/// Render any command error for stderr
pub fn explain(error: &anyhow::Error) -> String {
    if let Some(xr) = error.downcast_ref::<XrError>() {
        return xr.to_string();
    }
    if let Some(xr) = error.downcast_ref::<OrchestratorError>().and_then(XrError::from_orchestrator) {
        return xr.to_string();
    }
    format!("error: {error:#}\n")
}
