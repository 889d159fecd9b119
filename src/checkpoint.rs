//! Durable per-table migration progress.
//!
//! One JSON file per in-progress table at
//! `<checkpoint_dir>/<table>_checkpoint.json`. Files are written
//! temp-then-rename so a reader never observes a torn record; a present
//! file is an authoritative signal to resume. The record is removed when
//! the table completes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FerryError;
use crate::stream::Cursor;

/// Progress record for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub table_name: String,
    pub last_cursor: Cursor,
    pub total_rows: i64,
    pub chunk_size: usize,
    /// `YYYY-MM-DD HH:MM:SS` UTC.
    pub updated_at: String,
}

impl Checkpoint {
    pub fn new(table_name: &str, last_cursor: Cursor, total_rows: i64, chunk_size: usize) -> Self {
        Self {
            table_name: table_name.to_string(),
            last_cursor,
            total_rows,
            chunk_size,
            updated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Filesystem-backed checkpoint store.
///
/// Writes within one table are serialized by the owning worker; distinct
/// tables write distinct files, so cross-table writes need no locking.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the checkpoint directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), FerryError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io_err(&self.dir, e))
    }

    fn path_for(&self, table_name: &str) -> PathBuf {
        // table names are schema-qualified with a dot; keep the file name flat
        let safe = table_name.replace('/', "_");
        self.dir.join(format!("{}_checkpoint.json", safe))
    }

    fn io_err(&self, path: &Path, e: std::io::Error) -> FerryError {
        FerryError::CheckpointIo {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    /// Atomically persist a checkpoint: write `<file>.tmp`, then rename.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), FerryError> {
        self.ensure_dir()?;
        let path = self.path_for(&checkpoint.table_name);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| FerryError::InternalError(format!("checkpoint encode: {}", e)))?;
        fs::write(&tmp, json).map_err(|e| self.io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| self.io_err(&path, e))
    }

    /// Load the checkpoint for a table, or `None` when absent.
    ///
    /// A file that exists but fails to parse is treated as an error, not
    /// as absence: silently restarting a half-migrated multi-gigabyte
    /// table is worse than making the operator look.
    pub fn load(&self, table_name: &str) -> Result<Option<Checkpoint>, FerryError> {
        let path = self.path_for(table_name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(&path, e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| FerryError::CheckpointIo {
                path: path.display().to_string(),
                message: format!("corrupt checkpoint: {}", e),
            })
    }

    /// Remove a table's checkpoint after successful completion.
    pub fn remove(&self, table_name: &str) -> Result<(), FerryError> {
        let path = self.path_for(table_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(&path, e)),
        }
    }

    /// Whether a checkpoint exists for the table.
    pub fn exists(&self, table_name: &str) -> bool {
        self.path_for(table_name).exists()
    }
}
