// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! xr - export overflow recovery CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod error;
mod logging;
mod output;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{export, scan, stitch, Context};
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "xr",
    version,
    about = "Recover rows from export overflow logs and stitch replica copies"
)]
struct Cli {
    /// TOML config file with [engine] and [sink] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Report format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export partitions of a stream from one overflow directory
    Export(export::ExportArgs),
    /// Export one partition from several replica directories without duplicates
    Stitch(stitch::StitchArgs),
    /// Print the sequence ranges held by each partition
    Scan(scan::ScanArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{e:#}");
            eprint!("{}", error::explain(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping runs");
                cancel.cancel();
            }
        }
    });

    let ctx = Context {
        config: cli.config,
        format: cli.format,
        cancel,
    };

    match cli.command {
        Commands::Export(args) => export::handle(args, &ctx).await,
        Commands::Stitch(args) => stitch::handle(args, &ctx).await,
        Commands::Scan(args) => scan::handle(args, &ctx),
    }
}
