//! Replica stitching specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn stitch_fills_leader_gap_from_replica() {
    let project = Project::empty();
    project.segments("leader", 0, &[(1, 50), (80, 100)]);
    project.segments("replica", 0, &[(1, 100)]);

    project
        .xr()
        .args(&[
            "stitch", "--input", "leader", "--input", "replica", "--stream", "orders", "--partition", "0", "--outdir", "out",
        ])
        .passes()
        .stdout_has("exported 100 of 100 planned rows, 0 failed");

    let first = project.csv_lines("ORDERS_0_1_50");
    let middle = project.csv_lines("ORDERS_0_51_79");
    let last = project.csv_lines("ORDERS_0_80_100");
    assert_eq!((first.len(), middle.len(), last.len()), (50, 29, 21));
    assert_eq!(middle[0], "51,0,51");
    assert_eq!(middle[28], "79,0,79");
}

#[test]
fn stitch_with_full_leader_ignores_the_replica() {
    let project = Project::empty();
    project.segments("leader", 0, &[(1, 30)]);
    project.segments("replica", 0, &[(1, 30)]);

    project
        .xr()
        .args(&[
            "stitch", "--input", "leader", "--input", "replica", "--stream", "orders", "--partition", "0", "--outdir", "out",
        ])
        .passes()
        .stdout_has("exported 30 of 30 planned rows");

    assert_eq!(project.csv_lines("ORDERS_0_1_30").len(), 30);
    assert_eq!(std::fs::read_dir(project.path().join("out")).unwrap().count(), 1);
}

#[test]
fn stitch_keeps_segment_files() {
    let project = Project::empty();
    let leader = project.segments("leader", 0, &[(1, 20)]);

    project
        .xr()
        .args(&["stitch", "--input", "leader", "--stream", "orders", "--partition", "0", "--sink", "none"])
        .passes();

    assert_eq!(std::fs::read_dir(&leader).unwrap().count(), 1);
}

#[test]
fn stitch_without_rows_fails() {
    let project = Project::empty();
    project.host("a");
    project.host("b");

    project
        .xr()
        .args(&["stitch", "--input", "a", "--input", "b", "--stream", "orders", "--partition", "0", "--sink", "none"])
        .fails()
        .stderr_has("no input directory holds rows for 'orders' partition 0");
}
