// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xr export` - recover partitions from one overflow directory

use super::{finish, Context};
use crate::settings::{self, RunArgs, SinkKind};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use xr_adapters::{DecoderFactory, NoOpDecoderFactory, TracedDecoderFactory};
use xr_core::config::{parse_partitions, parse_range, parse_skips};
use xr_core::{DecodeConfig, Retention, SeqRange};
use xr_engine::{Orchestrator, RecoveryPlan, Report};

#[derive(Args)]
pub struct ExportArgs {
    /// Directory holding the overflow segment files
    #[arg(long)]
    pub input: PathBuf,

    /// Stream (table) name
    #[arg(long)]
    pub stream: String,

    /// Comma separated partitions to export (default: all found)
    #[arg(long)]
    pub partitions: Option<String>,

    /// Inclusive sequence range "START,END"
    #[arg(long, value_parser = parse_range)]
    pub range: Option<SeqRange>,

    /// Rows to skip per partition, "P:N,P:N"
    #[arg(long)]
    pub skip: Option<String>,

    /// Delete segment files once every block in them was exported
    #[arg(long)]
    pub reclaim: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn handle(args: ExportArgs, ctx: &Context) -> Result<()> {
    let config = settings::resolve(ctx.config.as_deref(), &args.run, settings::env_lookup)?;
    let mut decode = settings::decode_config(&config, &args.run);
    if let Some(range) = args.range {
        decode = decode.with_range(range);
    }

    let plan = RecoveryPlan {
        input: args.input,
        stream: args.stream,
        partitions: args.partitions.as_deref().map(parse_partitions).transpose()?.unwrap_or_default(),
        skips: args.skip.as_deref().map(parse_skips).transpose()?.unwrap_or_default(),
        nonce_prefix: config.sink.nonce.clone(),
        retention: if args.reclaim { Retention::Reclaim } else { config.engine.retention },
    };
    let threads = config.engine.threads;

    let report = match args.run.sink {
        SinkKind::Csv => recover(settings::csv_factory(&config)?, decode, threads, &plan, ctx).await?,
        SinkKind::None => recover(TracedDecoderFactory::new(NoOpDecoderFactory::new()), decode, threads, &plan, ctx).await?,
    };
    finish(&report, ctx.format)
}

async fn recover<F: DecoderFactory>(
    factory: F,
    decode: DecodeConfig,
    threads: usize,
    plan: &RecoveryPlan,
    ctx: &Context,
) -> Result<Report> {
    let orchestrator = Orchestrator::new(factory, decode, threads).with_cancellation(ctx.cancel.clone());
    let report = orchestrator.recover(plan).await;
    orchestrator.shutdown();
    Ok(report?)
}
