// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration
//!
//! [`DecodeConfig`] holds the immutable parameters of one engine run.
//! [`XrConfig`] is the optional TOML file; command line flags and the
//! environment are layered on top of it by the CLI.

use crate::tracker::{SeqRange, INFINITE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the block watchdog timeout, in milliseconds
pub const BLOCK_TIMEOUT_ENV: &str = "XR_BLOCK_TIMEOUT_MS";

pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(8000);
pub const DEFAULT_THREADS: usize = 20;

/// Errors in user-supplied configuration, reported before any run starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid range '{0}': expected 'start,end' with start < end")]
    InvalidRange(String),
    #[error("invalid partition list '{0}'")]
    InvalidPartitions(String),
    #[error("invalid skip entry '{0}': expected 'partition:count'")]
    InvalidSkip(String),
    #[error("invalid property '{0}': expected 'key=value'")]
    InvalidProperty(String),
    #[error("thread count must be at least 1")]
    InvalidThreads,
    #[error("partition {partition} not found for stream {stream}")]
    UnknownPartition { stream: String, partition: u32 },
    #[error("input directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("no input directories given")]
    NoInput,
    #[error("invalid {var} value '{value}'")]
    InvalidEnv { var: &'static str, value: String },
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What happens to segment files once their blocks are released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    /// Never delete anything (recovery reads are non-destructive)
    #[default]
    Keep,
    /// Delete a segment file once every block in it was released
    Reclaim,
}

/// Immutable parameters of one engine run
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    /// Inclusive sequence range to export
    pub range: SeqRange,
    /// Rows to discard at the start of the range before exporting
    pub skip: u64,
    /// Maximum rows to export
    pub count: u64,
    pub scan_only: bool,
    /// Decode rows before the range start before discarding them
    pub decode_skipped: bool,
    pub block_timeout: Duration,
    pub backoff_cap: Duration,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            range: SeqRange::new(0, INFINITE),
            skip: 0,
            count: INFINITE,
            scan_only: false,
            decode_skipped: true,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            backoff_cap: DEFAULT_BACKOFF_CAP,
        }
    }
}

impl DecodeConfig {
    pub fn scan() -> Self {
        Self {
            scan_only: true,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: SeqRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    pub fn with_backoff_cap(mut self, cap: Duration) -> Self {
        self.backoff_cap = cap;
        self
    }

    pub fn with_decode_skipped(mut self, decode_skipped: bool) -> Self {
        self.decode_skipped = decode_skipped;
        self
    }
}

/// `[engine]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    #[serde(with = "humantime_serde")]
    pub block_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_cap: Duration,
    pub threads: usize,
    pub retention: Retention,
    pub decode_skipped: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            threads: DEFAULT_THREADS,
            retention: Retention::Keep,
            decode_skipped: true,
        }
    }
}

/// `[sink]` table of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub outdir: Option<PathBuf>,
    /// Prefix for recovery nonces; defaults to the upper-cased stream name
    pub nonce: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    pub engine: EngineSettings,
    pub sink: SinkSettings,
}

impl XrConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if config.engine.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(BLOCK_TIMEOUT_ENV) {
            let ms: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: BLOCK_TIMEOUT_ENV,
                value: value.clone(),
            })?;
            self.engine.block_timeout = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Build the per-run decode parameters from the engine settings
    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig::default()
            .with_block_timeout(self.engine.block_timeout)
            .with_backoff_cap(self.engine.backoff_cap)
            .with_decode_skipped(self.engine.decode_skipped)
    }
}

/// Parse `"start,end"` into an inclusive range; `start` must be below `end`
pub fn parse_range(text: &str) -> Result<SeqRange, ConfigError> {
    let invalid = || ConfigError::InvalidRange(text.to_string());
    let (start, end) = text.split_once(',').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let end: u64 = end.trim().parse().map_err(|_| invalid())?;
    if start >= end {
        return Err(invalid());
    }
    Ok(SeqRange::new(start, end))
}

/// Parse a comma separated partition list, deduplicated and sorted
pub fn parse_partitions(text: &str) -> Result<Vec<u32>, ConfigError> {
    let mut partitions = text
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidPartitions(text.to_string()))?;
    partitions.sort_unstable();
    partitions.dedup();
    Ok(partitions)
}

/// Parse a `P:N,P:N` list of per-partition skip counts
pub fn parse_skips(text: &str) -> Result<BTreeMap<u32, u64>, ConfigError> {
    text.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidSkip(entry.to_string());
            let (partition, count) = entry.split_once(':').ok_or_else(invalid)?;
            let partition = partition.trim().parse().map_err(|_| invalid())?;
            let count = count.trim().parse().map_err(|_| invalid())?;
            Ok((partition, count))
        })
        .collect()
}

/// Parse a `key=value` sink property
pub fn parse_property(text: &str) -> Result<(String, String), ConfigError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::InvalidProperty(text.to_string())),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
