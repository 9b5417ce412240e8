// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row records and their binary encoding
//!
//! Each column is encoded as a null flag byte followed, when not null, by the
//! value. Integers and floats are little-endian; variable-length values carry a
//! `u32` little-endian length prefix.

use crate::schema::{ColumnType, RowSchema};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors decoding a row record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row truncated reading column {column}")]
    Truncated { column: String },
    #[error("column {column} is not valid utf-8")]
    InvalidUtf8 { column: String },
    #[error("{extra} trailing bytes after last column")]
    TrailingBytes { extra: usize },
    #[error("value for column {column} does not match type {expected:?}")]
    TypeMismatch { column: String, expected: ColumnType },
    #[error("row has {actual} values, schema has {expected} columns")]
    Arity { expected: usize, actual: usize },
}

/// A decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(f64),
    Varchar(String),
    /// Microseconds since the Unix epoch
    Timestamp(i64),
    Varbinary(Vec<u8>),
}

impl Value {
    fn matches(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::TinyInt(_), ColumnType::TinyInt)
                | (Value::SmallInt(_), ColumnType::SmallInt)
                | (Value::Integer(_), ColumnType::Integer)
                | (Value::BigInt(_), ColumnType::BigInt)
                | (Value::Float(_), ColumnType::Float)
                | (Value::Varchar(_), ColumnType::Varchar)
                | (Value::Timestamp(_), ColumnType::Timestamp)
                | (Value::Varbinary(_), ColumnType::Varbinary)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::TinyInt(v) => write!(f, "{v}"),
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Varchar(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::Varbinary(bytes) => {
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

/// One decoded row, bound to the schema in force when it was decoded
#[derive(Debug, Clone)]
pub struct Row {
    pub seq: u64,
    pub partition: u32,
    pub schema: Arc<RowSchema>,
    pub values: Vec<Value>,
}

impl Row {
    /// Decode one row record under `schema`
    pub fn decode(
        schema: &Arc<RowSchema>,
        partition: u32,
        seq: u64,
        record: &[u8],
    ) -> Result<Self, RowError> {
        let mut cursor = Cursor { buf: record, pos: 0 };
        let mut values = Vec::with_capacity(schema.columns.len());

        for column in &schema.columns {
            let name = || column.name.clone();
            let null = cursor.take(1).ok_or_else(|| RowError::Truncated { column: name() })?[0];
            if null != 0 {
                values.push(Value::Null);
                continue;
            }
            let value = match column.ty {
                ColumnType::TinyInt => cursor.array::<1>().map(|b| Value::TinyInt(i8::from_le_bytes(b))),
                ColumnType::SmallInt => cursor.array::<2>().map(|b| Value::SmallInt(i16::from_le_bytes(b))),
                ColumnType::Integer => cursor.array::<4>().map(|b| Value::Integer(i32::from_le_bytes(b))),
                ColumnType::BigInt => cursor.array::<8>().map(|b| Value::BigInt(i64::from_le_bytes(b))),
                ColumnType::Float => cursor.array::<8>().map(|b| Value::Float(f64::from_le_bytes(b))),
                ColumnType::Timestamp => cursor.array::<8>().map(|b| Value::Timestamp(i64::from_le_bytes(b))),
                ColumnType::Varchar => match cursor.prefixed() {
                    Some(bytes) => Some(Value::Varchar(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|_| RowError::InvalidUtf8 { column: name() })?,
                    )),
                    None => None,
                },
                ColumnType::Varbinary => cursor.prefixed().map(|b| Value::Varbinary(b.to_vec())),
            };
            values.push(value.ok_or_else(|| RowError::Truncated { column: name() })?);
        }

        let extra = record.len() - cursor.pos;
        if extra > 0 {
            return Err(RowError::TrailingBytes { extra });
        }

        Ok(Self {
            seq,
            partition,
            schema: Arc::clone(schema),
            values,
        })
    }

    pub fn generation(&self) -> u64 {
        self.schema.generation
    }
}

/// Encode a row record for `schema`
pub fn encode_row(schema: &RowSchema, values: &[Value]) -> Result<Vec<u8>, RowError> {
    if values.len() != schema.columns.len() {
        return Err(RowError::Arity {
            expected: schema.columns.len(),
            actual: values.len(),
        });
    }

    let mut out = Vec::new();
    for (column, value) in schema.columns.iter().zip(values) {
        if !value.matches(column.ty) {
            return Err(RowError::TypeMismatch {
                column: column.name.clone(),
                expected: column.ty,
            });
        }
        match value {
            Value::Null => out.push(1),
            Value::TinyInt(v) => put(&mut out, &v.to_le_bytes()),
            Value::SmallInt(v) => put(&mut out, &v.to_le_bytes()),
            Value::Integer(v) => put(&mut out, &v.to_le_bytes()),
            Value::BigInt(v) | Value::Timestamp(v) => put(&mut out, &v.to_le_bytes()),
            Value::Float(v) => put(&mut out, &v.to_le_bytes()),
            Value::Varchar(s) => put_prefixed(&mut out, s.as_bytes()),
            Value::Varbinary(b) => put_prefixed(&mut out, b),
        }
    }
    Ok(out)
}

fn put(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(0);
    out.extend_from_slice(bytes);
}

fn put_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(0);
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N).and_then(|s| s.try_into().ok())
    }

    fn prefixed(&mut self) -> Option<&'a [u8]> {
        let len = u32::from_le_bytes(self.array::<4>()?) as usize;
        self.take(len)
    }
}

#[cfg(test)]
#[path = "row_tests.rs"]
mod tests;
