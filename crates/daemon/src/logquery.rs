// SPDX-License-Identifier: MIT

//! Read-side helpers over the Action Log's day files (§4.6, §6).
//!
//! The log sink only appends; everything here opens a day file directly and
//! tolerates a truncated trailing line the same way `ReportStore::read_day`
//! does — a reader can run concurrently with the writer without taking a
//! lock on it.

use aquactl_core::ActionRecord;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::path::Path;

pub const PAGE_SIZE: usize = 50;

fn day_path(log_dir: &Path, date: NaiveDate) -> std::path::PathBuf {
    log_dir.join(format!("actions-{}.log", date.format("%Y-%m-%d")))
}

pub fn read_day(log_dir: &Path, date: NaiveDate) -> Vec<ActionRecord> {
    let path = day_path(log_dir, date);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut records = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) if i == lines.len() - 1 => {
                tracing::warn!(path = %path.display(), error = %e, "discarding truncated trailing action log record");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unparseable action log record");
            }
        }
    }
    records
}

/// Every record with `timestamp_ms >= since_ms`, scanning only the calendar
/// days that could contain one.
pub fn records_since(log_dir: &Path, since_ms: u64) -> Vec<ActionRecord> {
    let since_date = epoch_ms_to_date(since_ms);
    let today = Utc::now().date_naive();
    let mut records = Vec::new();
    let mut date = since_date;
    while date <= today {
        records.extend(read_day(log_dir, date));
        date += ChronoDuration::days(1);
    }
    records.retain(|r| r.timestamp_ms >= since_ms);
    records
}

pub fn success_rate_since(log_dir: &Path, since_ms: u64) -> f64 {
    let records = records_since(log_dir, since_ms);
    if records.is_empty() {
        return 1.0;
    }
    let successes = records.iter().filter(|r| r.is_success()).count();
    successes as f64 / records.len() as f64
}

/// One page of a day's records, optionally filtered by outcome (the `level`
/// query parameter — `ActionRecord` carries an `outcome`, not a log-style
/// level, so `level` is interpreted as an outcome filter: `SUCCESS`,
/// `FAIL`, `TIMEOUT`, `PROTOCOL_ERROR`, `UNREACHABLE`).
pub fn query_day(log_dir: &Path, date: NaiveDate, outcome_filter: Option<&str>, page: usize) -> Vec<ActionRecord> {
    let mut records = read_day(log_dir, date);
    if let Some(filter) = outcome_filter {
        records.retain(|r| r.outcome.to_string().eq_ignore_ascii_case(filter));
    }
    let page = page.max(1);
    let start = (page - 1) * PAGE_SIZE;
    records.into_iter().skip(start).take(PAGE_SIZE).collect()
}

fn epoch_ms_to_date(ms: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive()).unwrap_or_else(|| Utc::now().date_naive())
}

#[cfg(test)]
#[path = "logquery_tests.rs"]
mod tests;
