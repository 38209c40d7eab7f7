// SPDX-License-Identifier: MIT

//! Report Store: one NDJSON file per calendar day holding everything that
//! makes up that day's summary — `ExecutionReport`s, the Monitor's
//! per-cycle `MonitorSample`s, and `AlertEvent`s (§4.9).
//!
//! A day's file is read back in full, appended to in memory, and rewritten
//! atomically (write to a temp file, then rename over the original) — this
//! is what lets a reader tolerate a truncated trailing record left by a
//! crash mid-write: a line that fails to parse is only an error if it isn't
//! the last one in the file.

use aquactl_core::{AlertEvent, ExecutionReport, MonitorSample, PersistenceError};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One line of a day's report file. Adjacently tagged so a reader can tell
/// the three record kinds apart without guessing from shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Execution(ExecutionReport),
    Sample(MonitorSample),
    Alert(AlertEvent),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaySummary {
    pub executions: Vec<ExecutionReport>,
    pub samples: Vec<MonitorSample>,
    pub alerts: Vec<AlertEvent>,
}

impl DaySummary {
    fn push(&mut self, entry: ReportEntry) {
        match entry {
            ReportEntry::Execution(r) => self.executions.push(r),
            ReportEntry::Sample(s) => self.samples.push(s),
            ReportEntry::Alert(a) => self.alerts.push(a),
        }
    }

    fn entries(&self) -> Vec<ReportEntry> {
        let mut entries = Vec::with_capacity(self.executions.len() + self.samples.len() + self.alerts.len());
        entries.extend(self.executions.iter().cloned().map(ReportEntry::Execution));
        entries.extend(self.samples.iter().cloned().map(ReportEntry::Sample));
        entries.extend(self.alerts.iter().cloned().map(ReportEntry::Alert));
        entries
    }
}

pub struct ReportStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl ReportStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir, lock: Mutex::new(()) })
    }

    pub fn append_execution(&self, report: &ExecutionReport) -> Result<(), PersistenceError> {
        self.append(epoch_ms_to_date(report.started_at_ms), ReportEntry::Execution(report.clone()))
    }

    pub fn append_sample(&self, sample: MonitorSample) -> Result<(), PersistenceError> {
        self.append(epoch_ms_to_date(sample.cycle_timestamp_ms), ReportEntry::Sample(sample))
    }

    pub fn append_alert(&self, alert: &AlertEvent) -> Result<(), PersistenceError> {
        self.append(epoch_ms_to_date(alert.timestamp_ms), ReportEntry::Alert(alert.clone()))
    }

    pub fn read_day(&self, date: NaiveDate) -> Result<DaySummary, PersistenceError> {
        let _guard = self.lock.lock();
        read_tolerant(&self.path_for(date))
    }

    fn append(&self, date: NaiveDate, entry: ReportEntry) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock();
        let path = self.path_for(date);
        let mut summary = read_tolerant(&path)?;
        summary.push(entry);
        write_atomic(&path, &summary)
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("reports-{}.log", date.format("%Y-%m-%d")))
    }
}

fn read_tolerant(path: &Path) -> Result<DaySummary, PersistenceError> {
    let mut summary = DaySummary::default();
    if !path.exists() {
        return Ok(summary);
    }
    let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    for (i, line) in lines.iter().enumerate() {
        match serde_json::from_str::<ReportEntry>(line) {
            Ok(entry) => summary.push(entry),
            Err(e) if i == lines.len() - 1 => {
                tracing::warn!(path = %path.display(), error = %e, "discarding truncated trailing report record");
                break;
            }
            Err(e) => return Err(PersistenceError::Corrupt(format!("{}: line {}: {e}", path.display(), i + 1))),
        }
    }
    Ok(summary)
}

fn write_atomic(path: &Path, summary: &DaySummary) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("log.tmp");
    let mut body = Vec::new();
    for entry in summary.entries() {
        serde_json::to_writer(&mut body, &entry)?;
        body.push(b'\n');
    }
    std::fs::write(&tmp, &body).map_err(|e| io_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

fn epoch_ms_to_date(ms: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive()).unwrap_or_else(|| Utc::now().date_naive())
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
#[path = "report_store_tests.rs"]
mod tests;
