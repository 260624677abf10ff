#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn bin() -> Command {
    Command::cargo_bin("geoname-match").expect("binary exists")
}

/// Scratch directory that is removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Output stem inside the workspace (no extension).
    pub fn stem(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// A CSV file read back as header-keyed records.
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl OutputTable {
    pub fn read(path: &Path) -> Self {
        let mut reader = csv::Reader::from_path(path).expect("open output csv");
        let headers = reader
            .headers()
            .expect("headers")
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let rows = reader
            .records()
            .map(|record| {
                let record = record.expect("record");
                headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// Rows whose `column` equals `value`.
    pub fn find(&self, column: &str, value: &str) -> Vec<&HashMap<String, String>> {
        self.rows
            .iter()
            .filter(|row| row.get(column).map(String::as_str) == Some(value))
            .collect()
    }
}
