//! Shared helpers for the CLI specs

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;
use xr_core::{encode_row, BlockHeader, Column, ColumnType, RowSchema, Value};
use xr_storage::{SegmentName, SegmentWriter};

pub use similar_asserts::assert_eq;

pub const STREAM: &str = "orders";

/// A scratch directory holding overflow hosts and CSV output
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create (or reuse) a host directory under the project
    pub fn host(&self, name: &str) -> PathBuf {
        let dir = self.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write one segment per range for `partition` of the `orders` stream.
    /// Blocks hold at most ten rows; the `id` column echoes the sequence.
    pub fn segments(&self, host: &str, partition: u32, ranges: &[(u64, u64)]) -> PathBuf {
        let dir = self.host(host);
        let schema = RowSchema::new("ORDERS", 1, vec![Column::new("id", ColumnType::BigInt)]);
        for (id, &(lo, hi)) in ranges.iter().enumerate() {
            let name = SegmentName::new(STREAM, partition, id as u64 + 1, id as u64);
            let mut writer = SegmentWriter::create(&dir, &name, &schema).unwrap();
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
        dir
    }

    /// Lines of a CSV file under the project's `out` directory
    pub fn csv_lines(&self, nonce: &str) -> Vec<String> {
        let path = self.path().join("out").join(format!("{nonce}.csv"));
        let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        text.lines().map(str::to_string).collect()
    }

    pub fn out_exists(&self) -> bool {
        self.path().join("out").exists()
    }

    pub fn xr(&self) -> CliBuilder {
        let mut cmd = Command::cargo_bin("xr").unwrap();
        cmd.current_dir(self.path());
        cmd.env("RUST_LOG", "warn");
        cmd.env_remove("XR_BLOCK_TIMEOUT_MS");
        CliBuilder { cmd }
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and require a zero exit code
    pub fn passes(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert { output };
        if !run.output.status.success() {
            panic!("expected success, got {}\nstderr:\n{}", run.output.status, run.stderr());
        }
        run
    }

    /// Run and require a non-zero exit code
    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert { output };
        if run.output.status.success() {
            panic!("expected failure\nstdout:\n{}", run.stdout());
        }
        run
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout lacks {expected:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr lacks {expected:?}:\n{stderr}");
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        assert_eq!(self.stdout(), expected);
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).unwrap()
    }
}
