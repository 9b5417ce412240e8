//! Error reporting specs

use crate::prelude::*;

#[test]
fn missing_input_directory_is_explained() {
    let project = Project::empty();

    project
        .xr()
        .args(&["export", "--input", "nowhere", "--stream", "orders", "--sink", "none"])
        .fails()
        .stderr_has("input directory 'nowhere' does not exist")
        .stderr_has("Check the --input path");
}

#[test]
fn unknown_partition_suggests_scan() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--partitions", "7", "--sink", "none"])
        .fails()
        .stderr_has("partition 7 of stream 'orders' not found")
        .stderr_has("xr scan --input <DIR> --stream orders");
}

#[test]
fn csv_sink_without_outdir_fails() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders"])
        .fails()
        .stderr_has("no output directory for the csv sink");
}

#[test]
fn reversed_range_is_rejected() {
    Project::empty()
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--range", "5,1"])
        .fails()
        .stderr_has("invalid range '5,1'");
}

#[test]
fn malformed_timeout_env_is_rejected() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);

    project
        .xr()
        .env("XR_BLOCK_TIMEOUT_MS", "soon")
        .args(&["export", "--input", "host", "--stream", "orders", "--sink", "none"])
        .fails()
        .stderr_has("invalid XR_BLOCK_TIMEOUT_MS value 'soon'");
}

#[test]
fn malformed_skip_list_is_rejected() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--sink", "none", "--skip", "0-3"])
        .fails()
        .stderr_has("invalid skip entry");
}
