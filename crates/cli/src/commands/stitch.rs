// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xr stitch` - export one partition from replica directories

use super::{finish, Context};
use crate::settings::{self, RunArgs, SinkKind};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use xr_adapters::{DecoderFactory, NoOpDecoderFactory, TracedDecoderFactory};
use xr_core::DecodeConfig;
use xr_engine::{Orchestrator, Report, StitchPlan};

#[derive(Args)]
pub struct StitchArgs {
    /// Replica directory (repeatable); the first one with data leads
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Stream (table) name
    #[arg(long)]
    pub stream: String,

    #[arg(long)]
    pub partition: u32,

    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn handle(args: StitchArgs, ctx: &Context) -> Result<()> {
    let config = settings::resolve(ctx.config.as_deref(), &args.run, settings::env_lookup)?;
    let decode = settings::decode_config(&config, &args.run);
    let plan = StitchPlan {
        inputs: args.inputs,
        stream: args.stream,
        partition: args.partition,
    };
    let threads = config.engine.threads;

    let report = match args.run.sink {
        SinkKind::Csv => stitch(settings::csv_factory(&config)?, decode, threads, &plan, ctx).await?,
        SinkKind::None => stitch(TracedDecoderFactory::new(NoOpDecoderFactory::new()), decode, threads, &plan, ctx).await?,
    };
    finish(&report, ctx.format)
}

async fn stitch<F: DecoderFactory>(
    factory: F,
    decode: DecodeConfig,
    threads: usize,
    plan: &StitchPlan,
    ctx: &Context,
) -> Result<Report> {
    let orchestrator = Orchestrator::new(factory, decode, threads).with_cancellation(ctx.cancel.clone());
    let report = orchestrator.stitch(plan).await;
    orchestrator.shutdown();
    Ok(report?)
}
