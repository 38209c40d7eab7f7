// SPDX-License-Identifier: MIT

//! Scheduler job table: a single JSON document holding every `ScheduledJob`,
//! rewritten atomically on every mutation (§4.5).
//!
//! The Scheduler's contract requires a durable write to land before the
//! in-memory schedule changes, so `save` always replaces the whole table —
//! there's no incremental append format to get out of sync with the
//! in-memory `HashMap` the Scheduler keeps.

use aquactl_core::{PersistenceError, ScheduledJob};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub struct ScheduleStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ScheduleStore {
    /// Opens the job table at `path`, creating an empty one if the file
    /// doesn't exist yet — first-run self-initialization (§4.5).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
            write_atomic(&path, &[])?;
        }
        Ok(Self { path, lock: Mutex::new(()) })
    }

    pub fn load(&self) -> Result<Vec<ScheduledJob>, PersistenceError> {
        let _guard = self.lock.lock();
        let content = std::fs::read_to_string(&self.path).map_err(|e| io_error(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(PersistenceError::from)
    }

    /// Rewrites the whole table. Callers are expected to call this with the
    /// full desired job set — `create`/`update`/`delete` are all "load,
    /// mutate the vec, save" at the Scheduler layer.
    pub fn save(&self, jobs: &[ScheduledJob]) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock();
        write_atomic(&self.path, jobs)
    }
}

fn write_atomic(path: &Path, jobs: &[ScheduledJob]) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(jobs)?;
    std::fs::write(&tmp, &body).map_err(|e| io_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
#[path = "schedule_store_tests.rs"]
mod tests;
