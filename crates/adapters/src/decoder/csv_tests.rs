// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use xr_core::{Column, ColumnType};

fn schema() -> Arc<RowSchema> {
    Arc::new(RowSchema::new(
        "ORDERS",
        0,
        vec![
            Column::new("id", ColumnType::BigInt),
            Column::new("note", ColumnType::Varchar),
        ],
    ))
}

fn row(seq: u64, note: &str) -> Row {
    Row {
        seq,
        partition: 2,
        schema: schema(),
        values: vec![Value::BigInt(seq as i64 * 10), Value::Varchar(note.to_string())],
    }
}

fn source() -> Source {
    Source::for_range("orders", 2, 1, 100)
}

async fn export_block(decoder: &CsvDecoder, rows: &[Row]) {
    decoder.on_block_start(&rows[0]).await.unwrap();
    for row in rows {
        decoder.process_row(row).await.unwrap();
    }
    decoder.on_block_completion(&rows[rows.len() - 1]).await.unwrap();
}

#[tokio::test]
async fn rows_are_written_at_block_completion() {
    let dir = tempfile::tempdir().unwrap();
    let factory = CsvDecoderFactory::new(dir.path(), CsvOptions::default()).unwrap();
    let decoder = factory.create(&source()).unwrap();
    let path = factory.path_for(&source());

    decoder.on_block_start(&row(1, "a")).await.unwrap();
    decoder.process_row(&row(1, "a")).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

    decoder.process_row(&row(2, "b")).await.unwrap();
    decoder.on_block_completion(&row(2, "b")).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2,10,a\n2,2,20,b\n");
    assert!(path.ends_with("ORDERS_2_1_100.csv"));
}

#[tokio::test]
async fn restarted_block_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let factory = CsvDecoderFactory::new(dir.path(), CsvOptions::default()).unwrap();
    let decoder = factory.create(&source()).unwrap();

    decoder.on_block_start(&row(1, "a")).await.unwrap();
    decoder.process_row(&row(1, "a")).await.unwrap();
    // Restart: the block begins again
    export_block(&decoder, &[row(1, "a"), row(2, "b")]).await;

    let text = std::fs::read_to_string(factory.path_for(&source())).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[tokio::test]
async fn detach_drops_buffered_rows_and_rejects_calls() {
    let dir = tempfile::tempdir().unwrap();
    let factory = CsvDecoderFactory::new(dir.path(), CsvOptions::default()).unwrap();
    let decoder = factory.create(&source()).unwrap();

    decoder.on_block_start(&row(1, "a")).await.unwrap();
    decoder.process_row(&row(1, "a")).await.unwrap();
    decoder.detach();

    assert!(matches!(
        decoder.on_block_completion(&row(1, "a")).await,
        Err(DecodeError::Detached)
    ));
    assert_eq!(std::fs::read_to_string(factory.path_for(&source())).unwrap(), "");
}

#[tokio::test]
async fn replacement_decoder_appends_to_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let options = CsvOptions {
        header: true,
        ..CsvOptions::default()
    };
    let factory = CsvDecoderFactory::new(dir.path(), options).unwrap();

    let first = factory.create(&source()).unwrap();
    export_block(&first, &[row(1, "a")]).await;
    first.detach();

    let second = factory.create(&source()).unwrap();
    export_block(&second, &[row(2, "b")]).await;

    let text = std::fs::read_to_string(factory.path_for(&source())).unwrap();
    assert_eq!(text, "seq,partition,id,note\n1,2,10,a\n2,2,20,b\n");
}

#[tokio::test]
async fn fields_are_quoted_and_internals_skippable() {
    let dir = tempfile::tempdir().unwrap();
    let options = CsvOptions {
        skip_internals: true,
        ..CsvOptions::default()
    };
    let factory = CsvDecoderFactory::new(dir.path(), options).unwrap();
    let decoder = factory.create(&source()).unwrap();

    export_block(&decoder, &[row(1, "say \"hi\", twice")]).await;

    let text = std::fs::read_to_string(factory.path_for(&source())).unwrap();
    assert_eq!(text, "10,\"say \"\"hi\"\", twice\"\n");
}

#[test]
fn timestamps_format_as_utc() {
    assert_eq!(
        format_value(&Value::Timestamp(1_700_000_000_123_000)),
        "2023-11-14 22:13:20.123"
    );
}

#[test]
fn options_parse_from_properties() {
    let mut properties = BTreeMap::new();
    properties.insert("delimiter".to_string(), ";".to_string());
    properties.insert("header".to_string(), "true".to_string());
    properties.insert("nonce".to_string(), "ignored".to_string());

    let options = CsvOptions::from_properties(&properties).unwrap();
    assert_eq!(options.delimiter, ';');
    assert!(options.header);

    properties.insert("delimiter".to_string(), ";;".to_string());
    assert!(matches!(
        CsvOptions::from_properties(&properties),
        Err(DecodeError::Config(_))
    ));
}
