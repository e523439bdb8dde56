#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

use sales_lens::{
    pipeline::{PrepareOptions, PreparedDataset, prepare},
    validate::ValidatedRow,
};

pub const GAMES_FIXTURE: &str = "best_selling_games.csv";

/// Three rows, the second with an unparseable sales value.
pub const SCENARIO_CSV: &str = "game,sales,year,platform\nA,10,2001,X\nB,bad,2002,Y\nC,5,2001,X\n";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn prepare_str(csv: &str) -> PreparedDataset {
    prepare(csv.as_bytes(), &PrepareOptions::default()).expect("prepare dataset")
}

pub fn titles(rows: &[&ValidatedRow]) -> Vec<String> {
    rows.iter().map(|row| row.title.clone()).collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Scratch directory helper that cleans up files automatically on drop.
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
}
