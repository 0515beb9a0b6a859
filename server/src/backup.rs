//! Durable snapshotting of the full metric set.
//!
//! Each backup cycle replaces the snapshot wholesale: the JSON list is
//! written to a sibling temp file and atomically renamed over the target,
//! so a crash mid-write leaves the previous snapshot intact rather than a
//! truncated one. Restore tolerates a missing or empty file -- a fresh
//! deployment simply starts empty.

use pulse_core::Metric;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::storage::StorageError;

pub struct FileBackuper {
    path: PathBuf,
}

impl FileBackuper {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        // Same directory as the target so the rename never crosses
        // filesystems.
        let mut os = self.path.as_os_str().to_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }

    pub async fn backup(&self, metrics: &[Metric]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec(metrics)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn restore(&self) -> Result<Vec<Metric>, StorageError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }
}
