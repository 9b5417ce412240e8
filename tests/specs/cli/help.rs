//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_every_command() {
    Project::empty()
        .xr()
        .args(&["--help"])
        .passes()
        .stdout_has("export")
        .stdout_has("stitch")
        .stdout_has("scan");
}

#[test]
fn export_help_shows_window_flags() {
    Project::empty()
        .xr()
        .args(&["export", "--help"])
        .passes()
        .stdout_has("--range")
        .stdout_has("--skip")
        .stdout_has("--count")
        .stdout_has("--reclaim");
}

#[test]
fn stitch_requires_an_input() {
    Project::empty()
        .xr()
        .args(&["stitch", "--stream", "orders", "--partition", "0"])
        .fails()
        .stderr_has("--input");
}
