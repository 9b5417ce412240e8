//! Export to CSV specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn export_writes_one_file_per_partition() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 25)]);
    project.segments("host", 2, &[(1, 4)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--outdir", "out"])
        .passes()
        .stdout_has("ORDERS_0")
        .stdout_has("ORDERS_2")
        .stdout_has("exported 29 of 29 planned rows, 0 failed");

    let rows = project.csv_lines("ORDERS_0");
    assert_eq!(rows.len(), 25);
    assert_eq!(rows[0], "1,0,1");
    assert_eq!(rows[24], "25,0,25");
    assert_eq!(project.csv_lines("ORDERS_2"), vec!["1,2,1", "2,2,2", "3,2,3", "4,2,4"]);
}

#[test]
fn export_selected_partitions_only() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);
    project.segments("host", 1, &[(1, 5)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--partitions", "1", "--outdir", "out"])
        .passes()
        .stdout_has("exported 5 of 5 planned rows");

    assert!(!project.path().join("out/ORDERS_0.csv").exists());
    assert_eq!(project.csv_lines("ORDERS_1").len(), 5);
}

#[test]
fn export_properties_shape_the_csv() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 2)]);

    project
        .xr()
        .args(&[
            "export",
            "--input",
            "host",
            "--stream",
            "orders",
            "--outdir",
            "out",
            "--property",
            "header=true",
            "--property",
            "skipinternals=true",
            "--property",
            "delimiter=|",
        ])
        .passes();

    assert_eq!(project.csv_lines("ORDERS_0"), vec!["id", "1", "2"]);
}

#[test]
fn export_with_no_sink_writes_nothing() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 12)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--sink", "none"])
        .passes()
        .stdout_has("exported 12 of 12 planned rows, 0 failed");

    assert!(!project.out_exists());
}

#[test]
fn export_report_as_json() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 12)]);

    let run = project
        .xr()
        .args(&["--format", "json", "export", "--input", "host", "--stream", "orders", "--sink", "none"])
        .passes();
    let report = run.json();

    assert_eq!(report["planned_rows"], 12);
    assert_eq!(report["failures"], 0);
    assert_eq!(report["runs"][0]["nonce"], "ORDERS_0");
    assert_eq!(report["runs"][0]["rows_exported"], 12);
    assert_eq!(report["runs"][0]["complete"], true);
}

#[test]
fn reclaim_deletes_exported_segments() {
    let project = Project::empty();
    let host = project.segments("host", 0, &[(1, 12)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--sink", "none", "--reclaim"])
        .passes();

    assert_eq!(std::fs::read_dir(&host).unwrap().count(), 0);
}

#[test]
fn segments_are_kept_without_reclaim() {
    let project = Project::empty();
    let host = project.segments("host", 0, &[(1, 12)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--sink", "none"])
        .passes();

    assert_eq!(std::fs::read_dir(&host).unwrap().count(), 1);
}

#[test]
fn log_file_receives_engine_events() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 12)]);

    project
        .xr()
        .env("RUST_LOG", "info")
        .args(&["--log-file", "logs/xr.log", "export", "--input", "host", "--stream", "orders", "--sink", "none"])
        .passes();

    let log = std::fs::read_to_string(project.path().join("logs/xr.log")).unwrap();
    assert!(log.contains("export complete"), "log:\n{log}");
    assert!(log.contains("ORDERS_0"), "log:\n{log}");
}
