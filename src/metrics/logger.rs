use super::MetricsSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use csv::Writer;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Stamp shared by every file written for one run.
pub fn run_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// `<dir>/<name>_<stamp><suffix>`, e.g. `results/default_20250101_120000.csv`.
pub fn run_path(dir: impl AsRef<Path>, name: &str, stamp: &str, suffix: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_{}{}", name, stamp, suffix))
}

pub struct MetricsLogger {
    writer: Writer<File>,
    path: PathBuf,
}

impl MetricsLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = Writer::from_path(&path)
            .with_context(|| format!("creating metrics log {}", path.display()))?;
        Ok(Self { writer, path })
    }

    /// Opens `<dir>/<name>_<stamp>.csv`, creating `dir` if needed.
    pub fn for_run(dir: impl AsRef<Path>, name: &str, stamp: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating results directory {}", dir.display()))?;
        Self::new(run_path(dir, name, stamp, ".csv"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_batch(&mut self, snapshots: &[MetricsSnapshot]) -> Result<()> {
        for snapshot in snapshots {
            self.writer.serialize(snapshot)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
