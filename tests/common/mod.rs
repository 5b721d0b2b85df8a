#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stat_ingest::pipeline::IngestOptions;
use tempfile::{TempDir, tempdir};

pub const OVERVIEW_EXPORT: &str = "\
Date,Video Views,Profile Views,Likes,Comments,Shares
October 14,1200,300,80,5,2
";

pub const CONTENT_EXPORT: &str = "\
Time,Video title,Video link,Post time,Total likes,Total comments,Total shares,Total views
2025-10-18,Morning routine,https://example.com/v/1,2025-10-01,410,12,9,8800
2025-10-18,,https://example.com/v/2,not a date,,3,1,120
";

pub const VIEWERS_EXPORT: &str = "\
Date,Total Viewers,New Viewers,Returning Viewers
October 12,900,600,300
October 13,1000,640,360
";

pub const FOLLOWER_GROWTH_EXPORT: &str = "\
Date,Followers,Difference in followers from previous day
October 12,15250,12
October 13,15300,50
";

pub const GENDER_EXPORT: &str = "\
Gender,Distribution
Female,58%
Male,39%
Other,3%
";

pub const TERRITORY_EXPORT: &str = "\
Top territories,Distribution
United States,45%
United Kingdom,12%
";

pub const ACTIVE_HOURS_EXPORT: &str = "\
Date,Hour,Active followers
October 13,0,120
October 13,1,95
";

/// Reference date used across the integration tests.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid date")
}

pub fn options() -> IngestOptions {
    IngestOptions {
        today: today(),
        ..IngestOptions::default()
    }
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory the CSV sink writes its tables into.
    pub fn store_dir(&self) -> PathBuf {
        self.temp_dir.path().join("warehouse")
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}
