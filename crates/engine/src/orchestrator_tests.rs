// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use xr_adapters::{FakeDecoderFactory, FakeFailure};
use xr_core::{encode_row, BlockHeader, Column, ColumnType, RowSchema, Value};
use xr_storage::{SegmentName, SegmentWriter};

fn schema() -> RowSchema {
    RowSchema::new("ORDERS", 1, vec![Column::new("id", ColumnType::BigInt)])
}

/// One segment per range, cut into blocks of at most ten rows
fn write_host(dir: &Path, partition: u32, ranges: &[(u64, u64)]) {
    let schema = schema();
    for (id, &(lo, hi)) in ranges.iter().enumerate() {
        let name = SegmentName::new("orders", partition, id as u64 + 1, id as u64);
        let mut writer = SegmentWriter::create(dir, &name, &schema).unwrap();
        let mut start = lo;
        while start <= hi {
            let end = (start + 9).min(hi);
            let records: Vec<Vec<u8>> = (start..=end)
                .map(|seq| encode_row(&schema, &[Value::BigInt(seq as i64)]).unwrap())
                .collect();
            writer
                .append_records(&BlockHeader::new(start, records.len() as u32), &records)
                .unwrap();
            start = end + 1;
        }
        writer.finish().unwrap();
    }
}

fn stitch_plan(inputs: &[&Path]) -> StitchPlan {
    StitchPlan {
        inputs: inputs.iter().map(|p| p.to_path_buf()).collect(),
        stream: "orders".to_string(),
        partition: 0,
    }
}

fn recovery_plan(input: &Path) -> RecoveryPlan {
    RecoveryPlan {
        input: input.to_path_buf(),
        stream: "orders".to_string(),
        partitions: Vec::new(),
        skips: BTreeMap::new(),
        nonce_prefix: None,
        retention: Retention::Keep,
    }
}

fn sorted_nonces(report: &Report) -> Vec<String> {
    let mut nonces: Vec<String> = report.runs.iter().map(|r| r.nonce.clone()).collect();
    nonces.sort();
    nonces
}

fn sorted_commits(factory: &FakeDecoderFactory) -> Vec<u64> {
    let mut rows = factory.committed_rows();
    rows.sort_unstable();
    rows
}

#[tokio::test]
async fn stitch_fills_leader_gap_from_replica() {
    let leader = tempfile::tempdir().unwrap();
    let replica = tempfile::tempdir().unwrap();
    write_host(leader.path(), 0, &[(1, 50), (80, 100)]);
    write_host(replica.path(), 0, &[(1, 100)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 4);

    let report = orchestrator
        .stitch(&stitch_plan(&[leader.path(), replica.path()]))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.planned_rows, 100);
    assert_eq!(
        sorted_nonces(&report),
        vec!["ORDERS_0_1_50", "ORDERS_0_51_79", "ORDERS_0_80_100"]
    );
    assert_eq!(report.rows_exported(), 100);
    assert_eq!(sorted_commits(&factory), (1..=100).collect::<Vec<_>>());
}

#[tokio::test]
async fn stitch_with_identical_replicas_uses_leader_only() {
    let leader = tempfile::tempdir().unwrap();
    let replica = tempfile::tempdir().unwrap();
    write_host(leader.path(), 0, &[(1, 100)]);
    write_host(replica.path(), 0, &[(1, 100)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 4);

    let report = orchestrator
        .stitch(&stitch_plan(&[leader.path(), replica.path()]))
        .await
        .unwrap();

    assert_eq!(sorted_nonces(&report), vec!["ORDERS_0_1_100"]);
    assert!(report.runs[0].complete);
    assert_eq!(sorted_commits(&factory), (1..=100).collect::<Vec<_>>());
    assert_eq!(factory.instances(), 1);
}

#[tokio::test]
async fn stitch_leaves_out_empty_and_duplicate_hosts() {
    let leader = tempfile::tempdir().unwrap();
    let empty = tempfile::tempdir().unwrap();
    write_host(leader.path(), 0, &[(1, 20)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 4);

    let report = orchestrator
        .stitch(&stitch_plan(&[empty.path(), leader.path(), empty.path()]))
        .await
        .unwrap();

    assert_eq!(sorted_nonces(&report), vec!["ORDERS_0_1_20"]);
    assert_eq!(report.planned_rows, 20);
}

#[tokio::test]
async fn stitch_without_data_is_an_error() {
    let empty = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(FakeDecoderFactory::new(), DecodeConfig::default(), 4);

    let result = orchestrator.stitch(&stitch_plan(&[empty.path()])).await;

    assert!(matches!(result, Err(OrchestratorError::NoTrackers { partition: 0, .. })));
}

#[tokio::test]
async fn stitch_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let orchestrator = Orchestrator::new(FakeDecoderFactory::new(), DecodeConfig::default(), 4);

    let result = orchestrator.stitch(&stitch_plan(&[&missing])).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Config(ConfigError::MissingDirectory(_)))
    ));
}

#[tokio::test]
async fn recover_exports_every_partition_with_its_skip() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 25)]);
    write_host(dir.path(), 1, &[(1, 12)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 2);
    let mut plan = recovery_plan(dir.path());
    plan.skips.insert(1, 2);

    let mut report = orchestrator.recover(&plan).await.unwrap();
    report.runs.sort_by_key(|r| r.partition);

    assert!(report.is_success());
    assert_eq!(report.planned_rows, 37);
    assert_eq!(sorted_nonces(&report), vec!["ORDERS_0", "ORDERS_1"]);
    assert_eq!(report.runs[0].rows_exported, 25);
    assert_eq!(report.runs[1].rows_exported, 10);
    assert_eq!(report.runs[1].rows_skipped, 2);
    assert!(report.runs.iter().all(|r| r.complete));
}

#[tokio::test]
async fn recover_uses_nonce_prefix() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 4, &[(1, 5)]);
    let orchestrator = Orchestrator::new(FakeDecoderFactory::new(), DecodeConfig::default(), 2);
    let mut plan = recovery_plan(dir.path());
    plan.nonce_prefix = Some("nightly".to_string());

    let report = orchestrator.recover(&plan).await.unwrap();

    assert_eq!(sorted_nonces(&report), vec!["nightly_4"]);
}

#[tokio::test]
async fn recover_rejects_unknown_partitions() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 5)]);
    let orchestrator = Orchestrator::new(FakeDecoderFactory::new(), DecodeConfig::default(), 2);

    let mut plan = recovery_plan(dir.path());
    plan.partitions = vec![0, 7];
    let result = orchestrator.recover(&plan).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::Config(ConfigError::UnknownPartition { partition: 7, .. }))
    ));
}

#[tokio::test]
async fn recover_ignores_skips_for_partitions_not_exported() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 5)]);
    write_host(dir.path(), 1, &[(1, 5)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 2);

    let mut plan = recovery_plan(dir.path());
    plan.partitions = vec![0];
    plan.skips.insert(1, 2);
    plan.skips.insert(9, 4);
    let report = orchestrator.recover(&plan).await.unwrap();

    assert!(report.is_success());
    assert_eq!(sorted_nonces(&report), vec!["ORDERS_0"]);
    assert_eq!(report.runs[0].rows_exported, 5);
    assert_eq!(report.runs[0].rows_skipped, 0);
    assert_eq!(sorted_commits(&factory), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn recover_counts_failed_partitions() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 25)]);
    write_host(dir.path(), 1, &[(1, 12)]);
    let factory = FakeDecoderFactory::new();
    factory.fail_row(20, FakeFailure::Fault);
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 2);

    let mut report = orchestrator.recover(&recovery_plan(dir.path())).await.unwrap();
    report.runs.sort_by_key(|r| r.partition);

    assert_eq!(report.failures, 1);
    assert!(!report.is_success());
    assert!(!report.runs[0].success);
    assert!(report.runs[1].success);
}

#[tokio::test]
async fn recover_with_reclaim_deletes_exported_segments() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 25)]);
    let orchestrator = Orchestrator::new(FakeDecoderFactory::new(), DecodeConfig::default(), 2);
    let mut plan = recovery_plan(dir.path());
    plan.retention = Retention::Reclaim;

    let report = orchestrator.recover(&plan).await.unwrap();

    assert!(report.is_success());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn scan_reports_each_partition() {
    let dir = tempfile::tempdir().unwrap();
    write_host(dir.path(), 0, &[(1, 50), (80, 100)]);
    write_host(dir.path(), 2, &[(5, 9)]);
    let factory = FakeDecoderFactory::new();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 2);

    let trackers = orchestrator.scan(dir.path(), "orders", &[]).unwrap();

    assert_eq!(trackers.len(), 2);
    assert_eq!(trackers[&0].to_string(), "[1, 50] [80, 100]");
    assert_eq!(trackers[&2].to_string(), "[5, 9]");
    assert_eq!(factory.instances(), 0);
}

#[tokio::test]
async fn shutdown_failure_is_not_escalated() {
    let factory = FakeDecoderFactory::new();
    factory.fail_shutdown();
    let orchestrator = Orchestrator::new(factory.clone(), DecodeConfig::default(), 2);

    orchestrator.shutdown();

    assert_eq!(factory.shutdowns(), 1);
}
