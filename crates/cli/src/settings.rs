// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layering of CLI flags over environment, config file and defaults

use crate::error::XrError;
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xr_adapters::{CsvDecoderFactory, CsvOptions, TracedDecoderFactory};
use xr_core::config::parse_property;
use xr_core::{ConfigError, DecodeConfig, XrConfig};

/// Where exported rows go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// One CSV file per run under the output directory
    Csv,
    /// Decode and count rows without writing them
    None,
}

/// Flags shared by commands that export rows
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(long, value_enum, default_value = "csv")]
    pub sink: SinkKind,

    /// Output directory for the csv sink
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Sink property (repeatable), e.g. header=true
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Maximum concurrent runs
    #[arg(long)]
    pub threads: Option<usize>,

    /// Watchdog timeout for one block attempt, e.g. "90s"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub block_timeout: Option<Duration>,

    /// Maximum rows to export per run
    #[arg(long)]
    pub count: Option<u64>,
}

/// Resolve the effective configuration: flags, then `lookup` (the
/// environment), then the config file, then defaults.
pub fn resolve<E>(config_path: Option<&Path>, args: &RunArgs, lookup: E) -> Result<XrConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = match config_path {
        Some(path) => XrConfig::load(path)?,
        None => XrConfig::default(),
    };
    config.apply_env(lookup)?;

    if let Some(outdir) = &args.outdir {
        config.sink.outdir = Some(outdir.clone());
    }
    config.sink.properties.extend(args.properties.iter().cloned());
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        config.engine.threads = threads;
    }
    if let Some(timeout) = args.block_timeout {
        config.engine.block_timeout = timeout;
    }
    Ok(config)
}

pub fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Per-run parameters with the `--count` quota applied
pub fn decode_config(config: &XrConfig, args: &RunArgs) -> DecodeConfig {
    let decode = config.decode_config();
    match args.count {
        Some(count) => decode.with_count(count),
        None => decode,
    }
}

pub fn csv_factory(config: &XrConfig) -> Result<TracedDecoderFactory<CsvDecoderFactory>> {
    let outdir = config.sink.outdir.as_deref().ok_or_else(XrError::missing_outdir)?;
    let options = CsvOptions::from_properties(&config.sink.properties)?;
    Ok(TracedDecoderFactory::new(CsvDecoderFactory::new(outdir, options)?))
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
