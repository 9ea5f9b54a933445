//! Per-resource cursor persistence.
//!
//! The file store keeps one file per resource, named by the resource id and
//! holding a single `YYYY-MM-DD` date. Missing or corrupt files read back as
//! "no checkpoint" so the collector falls back to yesterday.

use async_trait::async_trait;
use chrono::NaiveDate;
use meter_ingest_core::{CheckpointError, CheckpointStore, ResourceId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Date format of a stored cursor.
pub const CURSOR_FORMAT: &str = "%Y-%m-%d";

/// Checkpoints stored as one file per resource in a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the checkpoint files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, resource: &ResourceId) -> Result<PathBuf, CheckpointError> {
        let key = resource.validated()?;
        Ok(self.dir.join(key))
    }
}

/// Parses stored cursor content, tolerating surrounding whitespace.
#[must_use]
pub fn parse_cursor(contents: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(contents.trim(), CURSOR_FORMAT).ok()
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, resource: &ResourceId) -> Option<NaiveDate> {
        let path = match self.path_for(resource) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(resource = %resource, error = %e, "Ignoring checkpoint");
                return None;
            }
        };

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(resource = %resource, "No checkpoint");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable checkpoint");
                return None;
            }
        };

        let cursor = parse_cursor(&contents);
        if cursor.is_none() {
            tracing::warn!(
                path = %path.display(),
                contents = %contents.trim(),
                "Unparseable checkpoint"
            );
        }
        cursor
    }

    async fn write(&self, resource: &ResourceId, cursor: NaiveDate) -> Result<(), CheckpointError> {
        let path = self.path_for(resource)?;
        let write_err = |source| CheckpointError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_err)?;

        // Write beside the target and rename so a crash never leaves a truncated cursor.
        let tmp = self.dir.join(format!(".{}.tmp", resource.as_str()));
        tokio::fs::write(&tmp, cursor.format(CURSOR_FORMAT).to_string())
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;

        tracing::debug!(resource = %resource, %cursor, "Checkpoint written");
        Ok(())
    }
}

/// Checkpoints held in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    cursors: Mutex<HashMap<ResourceId, NaiveDate>>,
    writes: Mutex<Vec<(ResourceId, NaiveDate)>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cursor.
    #[must_use]
    pub fn with_cursor(self, resource: impl Into<ResourceId>, cursor: NaiveDate) -> Self {
        self.cursors.lock().insert(resource.into(), cursor);
        self
    }

    /// Current cursor for a resource.
    #[must_use]
    pub fn get(&self, resource: &ResourceId) -> Option<NaiveDate> {
        self.cursors.lock().get(resource).copied()
    }

    /// Every write, in call order.
    #[must_use]
    pub fn writes(&self) -> Vec<(ResourceId, NaiveDate)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, resource: &ResourceId) -> Option<NaiveDate> {
        self.get(resource)
    }

    async fn write(&self, resource: &ResourceId, cursor: NaiveDate) -> Result<(), CheckpointError> {
        resource.validated()?;
        self.cursors.lock().insert(resource.clone(), cursor);
        self.writes.lock().push((resource.clone(), cursor));
        Ok(())
    }
}
