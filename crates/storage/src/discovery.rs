// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locating the segment files of a stream
//!
//! Two layouts are recognised. A nested export directory holds
//! `<dir>/<STREAM>/<partition>/*.pbd`; a flat directory holds segment files of
//! any number of streams and partitions side by side. The nested layout wins
//! when `<dir>/<STREAM>` exists.

use crate::log::LogError;
use crate::segment::{NameError, SegmentName};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A segment file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    pub name: SegmentName,
    pub path: PathBuf,
}

/// Find every partition of `stream` under `dir`, with segments in chain order
pub fn discover_stream(dir: &Path, stream: &str) -> Result<BTreeMap<u32, Vec<SegmentFile>>, LogError> {
    let nested = dir.join(stream.to_uppercase());
    let mut partitions = if nested.is_dir() {
        discover_nested(&nested, stream)?
    } else {
        discover_flat(dir, stream)?
    };

    for segments in partitions.values_mut() {
        order_chain(segments);
    }
    Ok(partitions)
}

fn discover_flat(dir: &Path, stream: &str) -> Result<BTreeMap<u32, Vec<SegmentFile>>, LogError> {
    let mut partitions: BTreeMap<u32, Vec<SegmentFile>> = BTreeMap::new();
    for (path, file_name) in list(dir)? {
        if path.is_dir() {
            continue;
        }
        match SegmentName::parse(&file_name) {
            Ok(name) if name.is_stream(stream) => {
                partitions
                    .entry(name.partition)
                    .or_default()
                    .push(SegmentFile { name, path });
            }
            Ok(name) => {
                tracing::debug!(file = %path.display(), stream = %name.stream, "segment of another stream");
            }
            Err(NameError::InvalidName) => {
                tracing::warn!(file = %path.display(), "not a valid segment name");
            }
            Err(NameError::NotSegment) => {}
        }
    }
    Ok(partitions)
}

fn discover_nested(stream_dir: &Path, stream: &str) -> Result<BTreeMap<u32, Vec<SegmentFile>>, LogError> {
    let mut partitions = BTreeMap::new();
    for (path, entry_name) in list(stream_dir)? {
        let partition = match entry_name.parse::<u32>() {
            Ok(partition) if path.is_dir() => partition,
            _ => {
                tracing::warn!(path = %path.display(), "unexpected entry in export stream directory");
                continue;
            }
        };

        let mut segments = Vec::new();
        for (file, file_name) in list(&path)? {
            if file.is_dir() {
                tracing::warn!(path = %file.display(), "unexpected directory in partition directory");
                continue;
            }
            match SegmentName::parse(&file_name) {
                Ok(name) if name.is_stream(stream) && name.partition == partition => {
                    segments.push(SegmentFile { name, path: file });
                }
                Ok(_) => tracing::warn!(file = %file.display(), "misplaced export file"),
                Err(NameError::InvalidName) => {
                    tracing::warn!(file = %file.display(), "not a valid segment name")
                }
                Err(NameError::NotSegment) => {
                    tracing::warn!(file = %file.display(), "not a segment file")
                }
            }
        }

        if segments.is_empty() {
            tracing::info!(dir = %path.display(), "found empty export directory");
        }
        partitions.insert(partition, segments);
    }
    Ok(partitions)
}

/// Sort by segment id and report breaks in the `prev_id` chain
fn order_chain(segments: &mut [SegmentFile]) {
    segments.sort_by_key(|s| s.name.id);
    for pair in segments.windows(2) {
        if pair[1].name.prev_id != pair[0].name.id {
            tracing::warn!(
                segment = %pair[1].path.display(),
                prev_id = pair[1].name.prev_id,
                expected = pair[0].name.id,
                "segment chain is broken, reading segments in id order"
            );
        }
    }
}

fn list(dir: &Path) -> Result<Vec<(PathBuf, String)>, LogError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| LogError::io(dir, e))? {
        let entry = entry.map_err(|e| LogError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((entry.path(), name));
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
