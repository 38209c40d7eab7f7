// SPDX-License-Identifier: MIT

//! Action Log: an append-only, date-rotated NDJSON trail of every
//! `ActionRecord` the Retry Executor produces (§4.6).
//!
//! Rotation is keyed off the record's own `timestamp_ms`, not wall-clock
//! time, so replaying a backlog of records out of real time still lands
//! each one in the right day's file. Writes are append-only — unlike the
//! Report Store and the Scheduler's job table, there is nothing here to
//! rewrite, so a plain `O_APPEND` open is enough to make concurrent-process
//! writes safe without an explicit file lock.

use aquactl_core::{ActionRecord, PersistenceError};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

struct OpenFile {
    date: NaiveDate,
    file: File,
}

/// Single-producer NDJSON sink, one file per calendar day.
///
/// `ActionLogSink` is `Sync` and meant to be shared behind an `Arc`, but it
/// serializes its own writes internally — callers don't need an external
/// lock to use it from multiple tasks.
pub struct ActionLogSink {
    dir: PathBuf,
    open: Mutex<Option<OpenFile>>,
}

impl ActionLogSink {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir, open: Mutex::new(None) })
    }

    /// Appends one record, rotating to a fresh day file if `record`'s
    /// timestamp has crossed a calendar boundary since the last write.
    pub fn append(&self, record: &ActionRecord) -> Result<(), PersistenceError> {
        let date = epoch_ms_to_date(record.timestamp_ms);
        let path = self.path_for(date);
        let mut guard = self.open.lock();
        match guard.as_mut() {
            Some(opened) if opened.date == date => write_record(opened, record, &path),
            _ => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| io_error(&path, e))?;
                let mut opened = OpenFile { date, file };
                write_record(&mut opened, record, &path)?;
                *guard = Some(opened);
                Ok(())
            }
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("actions-{}.log", date.format("%Y-%m-%d")))
    }
}

fn write_record(opened: &mut OpenFile, record: &ActionRecord, path: &Path) -> Result<(), PersistenceError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    opened.file.write_all(&line).map_err(|e| io_error(path, e))?;
    opened.file.flush().map_err(|e| io_error(path, e))
}

fn epoch_ms_to_date(ms: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive()).unwrap_or_else(|| Utc::now().date_naive())
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
#[path = "action_log_tests.rs"]
mod tests;
