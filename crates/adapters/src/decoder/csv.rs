// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CSV file sink
//!
//! Each source writes `{outdir}/{nonce}.csv`. Rows of a block are buffered and
//! appended when the block completes, so a restarted block never leaves
//! partial output behind.

use super::{DecodeError, Decoder, DecoderFactory};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use xr_core::{Row, RowSchema, Source, Value};

/// Formatting options, set from `--property` values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: char,
    /// Write a header line when creating a new file
    pub header: bool,
    /// Leave out the sequence number and partition columns
    pub skip_internals: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            header: false,
            skip_internals: false,
        }
    }
}

impl CsvOptions {
    /// Read `delimiter`, `header` and `skipinternals`; unknown keys are ignored
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self, DecodeError> {
        let mut options = Self::default();
        for (key, value) in properties {
            match key.as_str() {
                "delimiter" => {
                    let mut chars = value.chars();
                    options.delimiter = match (chars.next(), chars.next()) {
                        (Some(c), None) => c,
                        _ => return Err(DecodeError::Config(format!("delimiter must be one character: '{value}'"))),
                    };
                }
                "header" => options.header = parse_bool(key, value)?,
                "skipinternals" => options.skip_internals = parse_bool(key, value)?,
                _ => tracing::debug!(key, "ignoring sink property"),
            }
        }
        Ok(options)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::Config(format!("{key} must be true or false: '{value}'")))
}

/// Creates [`CsvDecoder`]s writing under one output directory
#[derive(Debug, Clone)]
pub struct CsvDecoderFactory {
    outdir: PathBuf,
    options: CsvOptions,
}

impl CsvDecoderFactory {
    pub fn new(outdir: &Path, options: CsvOptions) -> Result<Self, DecodeError> {
        std::fs::create_dir_all(outdir)?;
        Ok(Self {
            outdir: outdir.to_path_buf(),
            options,
        })
    }

    pub fn path_for(&self, source: &Source) -> PathBuf {
        self.outdir.join(format!("{}.csv", source.nonce))
    }
}

impl DecoderFactory for CsvDecoderFactory {
    type Decoder = CsvDecoder;

    fn create(&self, source: &Source) -> Result<CsvDecoder, DecodeError> {
        let path = self.path_for(source);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;
        tracing::debug!(path = %path.display(), fresh, "opened csv output");

        Ok(CsvDecoder {
            source: source.clone(),
            options: self.options.clone(),
            state: Mutex::new(CsvState {
                schema: None,
                file: Some(BufWriter::new(file)),
                needs_header: fresh && self.options.header,
                buffer: Vec::new(),
            }),
        })
    }

    fn shutdown(&self) -> Result<(), DecodeError> {
        Ok(())
    }
}

struct CsvState {
    schema: Option<Arc<RowSchema>>,
    /// `None` once detached
    file: Option<BufWriter<File>>,
    needs_header: bool,
    buffer: Vec<String>,
}

/// Appends rows to one CSV file
pub struct CsvDecoder {
    source: Source,
    options: CsvOptions,
    state: Mutex<CsvState>,
}

impl CsvDecoder {
    fn lock(&self) -> std::sync::MutexGuard<'_, CsvState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn format_row(&self, row: &Row) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(row.values.len() + 2);
        if !self.options.skip_internals {
            fields.push(row.seq.to_string());
            fields.push(row.partition.to_string());
        }
        fields.extend(row.values.iter().map(format_value));
        self.join(fields)
    }

    fn format_header(&self, schema: &RowSchema) -> String {
        let mut fields: Vec<String> = Vec::new();
        if !self.options.skip_internals {
            fields.push("seq".to_string());
            fields.push("partition".to_string());
        }
        fields.extend(schema.column_names().map(str::to_string));
        self.join(fields)
    }

    fn join(&self, fields: Vec<String>) -> String {
        let delimiter = self.options.delimiter;
        fields
            .iter()
            .map(|f| quote(f, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Timestamp(micros) => chrono::DateTime::<chrono::Utc>::from_timestamp_micros(*micros)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| micros.to_string()),
        other => other.to_string(),
    }
}

fn quote(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[async_trait]
impl Decoder for CsvDecoder {
    fn source(&self) -> &Source {
        &self.source
    }

    fn bind_schema(&self, schema: Arc<RowSchema>) {
        self.lock().schema = Some(schema);
    }

    fn current_schema(&self) -> Option<Arc<RowSchema>> {
        self.lock().schema.clone()
    }

    async fn on_block_start(&self, _row: &Row) -> Result<(), DecodeError> {
        let mut state = self.lock();
        if state.file.is_none() {
            return Err(DecodeError::Detached);
        }
        state.buffer.clear();
        Ok(())
    }

    async fn process_row(&self, row: &Row) -> Result<(), DecodeError> {
        let line = self.format_row(row);
        let mut state = self.lock();
        if state.file.is_none() {
            return Err(DecodeError::Detached);
        }
        state.buffer.push(line);
        Ok(())
    }

    async fn on_block_completion(&self, row: &Row) -> Result<(), DecodeError> {
        let header = self.format_header(&row.schema);
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(file) = state.file.as_mut() else {
            return Err(DecodeError::Detached);
        };

        if state.needs_header {
            writeln!(file, "{header}")?;
            state.needs_header = false;
        }
        for line in state.buffer.drain(..) {
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        Ok(())
    }

    fn detach(&self) {
        let mut state = self.lock();
        let dropped = state.buffer.len();
        state.buffer.clear();
        if let Some(mut file) = state.file.take() {
            if let Err(e) = file.flush() {
                tracing::warn!(nonce = %self.source.nonce, error = %e, "flush on detach failed");
            }
        }
        tracing::debug!(nonce = %self.source.nonce, dropped, "csv decoder detached");
    }
}

#[cfg(test)]
#[path = "csv_tests.rs"]
mod tests;
