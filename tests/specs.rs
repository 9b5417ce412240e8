//! Behavioral specifications for the xr CLI.
//!
//! These tests are black-box: they invoke the CLI binary against segment
//! files written to a temp directory and verify stdout, stderr, exit codes
//! and the CSV files left behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// export/
#[path = "specs/export/csv.rs"]
mod export_csv;
#[path = "specs/export/windows.rs"]
mod export_windows;

// stitch/
#[path = "specs/stitch/replicas.rs"]
mod stitch_replicas;

#[path = "specs/scan.rs"]
mod scan;
