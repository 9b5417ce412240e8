// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row schemas carried by log segments
//!
//! A schema is identified by its stream name and a generation tag. The
//! generation changes whenever the stream's layout changes; decoders rebind
//! when they see a block tagged with a generation they are not bound to.

use serde::{Deserialize, Serialize};

/// Column value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Varchar,
    Timestamp,
    Varbinary,
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Layout of the rows of one stream at one schema generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSchema {
    pub stream: String,
    pub generation: u64,
    pub columns: Vec<Column>,
}

impl RowSchema {
    pub fn new(stream: impl Into<String>, generation: u64, columns: Vec<Column>) -> Self {
        Self {
            stream: stream.into(),
            generation,
            columns,
        }
    }

    /// Serialize for embedding in a segment header
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
