//! Scan specs

use crate::prelude::*;

#[test]
fn scan_prints_ranges_per_partition() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 50), (80, 100)]);
    project.segments("host", 3, &[(5, 9)]);

    project
        .xr()
        .args(&["scan", "--input", "host", "--stream", "orders"])
        .passes()
        .stdout_eq("partition 0: [1, 50] [80, 100] (71 rows)\npartition 3: [5, 9] (5 rows)\n");
}

#[test]
fn scan_of_unknown_stream_finds_nothing() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);

    project
        .xr()
        .args(&["scan", "--input", "host", "--stream", "invoices"])
        .passes()
        .stdout_eq("no partitions found for invoices\n");
}
