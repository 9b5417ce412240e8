// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod export;
pub mod scan;
pub mod stitch;

use crate::error::XrError;
use crate::output::{self, OutputFormat, ReportView};
use anyhow::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use xr_engine::Report;

/// Settings shared by every command
pub struct Context {
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub cancel: CancellationToken,
}

/// Print the report; any failed run fails the command
fn finish(report: &Report, format: OutputFormat) -> Result<()> {
    output::print(&ReportView(report), format);
    if report.is_success() {
        Ok(())
    } else {
        Err(XrError::failed_runs(report.failures, report.runs.len()).into())
    }
}
