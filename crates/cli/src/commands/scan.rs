// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xr scan` - show the sequence ranges each partition holds

use super::Context;
use crate::output::{self, ScanView};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use xr_adapters::NoOpDecoderFactory;
use xr_core::config::parse_partitions;
use xr_core::DecodeConfig;
use xr_engine::Orchestrator;

#[derive(Args)]
pub struct ScanArgs {
    /// Directory holding the overflow segment files
    #[arg(long)]
    pub input: PathBuf,

    /// Stream (table) name
    #[arg(long)]
    pub stream: String,

    /// Comma separated partitions to scan (default: all found)
    #[arg(long)]
    pub partitions: Option<String>,
}

pub fn handle(args: ScanArgs, ctx: &Context) -> Result<()> {
    let partitions = args.partitions.as_deref().map(parse_partitions).transpose()?.unwrap_or_default();
    let orchestrator = Orchestrator::new(NoOpDecoderFactory::new(), DecodeConfig::scan(), 1);
    let trackers = orchestrator.scan(&args.input, &args.stream, &partitions)?;
    output::print(
        &ScanView {
            stream: &args.stream,
            partitions: &trackers,
        },
        ctx.format,
    );
    Ok(())
}
