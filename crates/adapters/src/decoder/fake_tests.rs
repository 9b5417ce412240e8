// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use xr_core::{Column, ColumnType, Value};

fn row(seq: u64) -> Row {
    Row {
        seq,
        partition: 0,
        schema: Arc::new(RowSchema::new("S", 0, vec![Column::new("v", ColumnType::BigInt)])),
        values: vec![Value::BigInt(seq as i64)],
    }
}

fn source() -> Source {
    Source::for_partition("s", 0, None)
}

#[tokio::test]
async fn completed_block_commits_rows() {
    let factory = FakeDecoderFactory::new();
    let decoder = factory.create(&source()).unwrap();

    decoder.on_block_start(&row(1)).await.unwrap();
    decoder.process_row(&row(1)).await.unwrap();
    decoder.process_row(&row(2)).await.unwrap();
    assert!(factory.committed_rows().is_empty());

    decoder.on_block_completion(&row(2)).await.unwrap();
    assert_eq!(factory.committed_rows(), vec![1, 2]);
}

#[tokio::test]
async fn scripted_failures_fire_once_in_order() {
    let factory = FakeDecoderFactory::new();
    factory.fail_row(5, FakeFailure::Restart { backoff: true });
    factory.fail_row(5, FakeFailure::Fault);
    let decoder = factory.create(&source()).unwrap();

    assert!(matches!(
        decoder.process_row(&row(5)).await,
        Err(DecodeError::Restart { backoff: true })
    ));
    assert!(matches!(decoder.process_row(&row(5)).await, Err(DecodeError::Fault(_))));
    assert!(decoder.process_row(&row(5)).await.is_ok());
}

#[tokio::test]
async fn hang_returns_after_detach() {
    let factory = FakeDecoderFactory::new();
    factory.fail_row(1, FakeFailure::Hang);
    let decoder = Arc::new(factory.create(&source()).unwrap());

    let hung = {
        let decoder = Arc::clone(&decoder);
        tokio::spawn(async move { decoder.process_row(&row(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!hung.is_finished());

    decoder.detach();
    assert!(matches!(hung.await.unwrap(), Err(DecodeError::Detached)));
    assert_eq!(factory.detach_count(), 1);
}

#[test]
fn create_failures_are_counted_down() {
    let factory = FakeDecoderFactory::new();
    factory.fail_creates(1);
    assert!(factory.create(&source()).is_err());

    let decoder = factory.create(&source()).unwrap();
    assert_eq!(decoder.instance(), 0);
    assert_eq!(
        factory.calls(),
        vec![DecoderCall::Create {
            instance: 0,
            nonce: "S_0".to_string()
        }]
    );
}

#[tokio::test]
async fn schema_drift_changes_the_reported_generation() {
    let factory = FakeDecoderFactory::new();
    factory.drift_schema_after(2);
    let decoder = factory.create(&source()).unwrap();
    decoder.bind_schema(row(1).schema);

    decoder.process_row(&row(1)).await.unwrap();
    assert_eq!(decoder.current_schema().map(|s| s.generation), Some(0));

    decoder.process_row(&row(2)).await.unwrap();
    assert_eq!(decoder.current_schema().map(|s| s.generation), Some(1));
}
