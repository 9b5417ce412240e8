//! Range, skip and count window specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn range_exports_only_rows_inside_it() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 25)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--outdir", "out", "--range", "2,4"])
        .passes()
        .stdout_has("incomplete");

    assert_eq!(project.csv_lines("ORDERS_0"), vec!["2,0,2", "3,0,3", "4,0,4"]);
}

#[test]
fn range_spanning_blocks_exports_each_row_once() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 30)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--outdir", "out", "--range", "8,14"])
        .passes();

    let rows = project.csv_lines("ORDERS_0");
    assert_eq!(rows.first().map(String::as_str), Some("8,0,8"));
    assert_eq!(rows.last().map(String::as_str), Some("14,0,14"));
    assert_eq!(rows.len(), 7);
}

#[test]
fn skip_drops_leading_rows_of_the_partition() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 5)]);
    project.segments("host", 1, &[(1, 5)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--outdir", "out", "--skip", "0:3"])
        .passes();

    assert_eq!(project.csv_lines("ORDERS_0"), vec!["4,0,4", "5,0,5"]);
    assert_eq!(project.csv_lines("ORDERS_1").len(), 5);
}

#[test]
fn count_caps_rows_per_run() {
    let project = Project::empty();
    project.segments("host", 0, &[(1, 25)]);

    project
        .xr()
        .args(&["export", "--input", "host", "--stream", "orders", "--outdir", "out", "--count", "3"])
        .passes();

    assert_eq!(project.csv_lines("ORDERS_0"), vec!["1,0,1", "2,0,2", "3,0,3"]);
}
