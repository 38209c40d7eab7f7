// SPDX-License-Identifier: MIT

use super::AppState;
use crate::logquery;
use aquactl_core::{
    ActionRecord, AlertEvent, Clock, DeviceHealthState, DeviceStatus, DeviceTarget, ExecutionReport, ScheduledAction, ScheduledJob, SystemClock,
    ValidationError,
};
use aquactl_engine::SchedulerError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Trips its token when dropped, so a handler future torn down early by a
/// client disconnect (axum/hyper drop the future in place, they don't run
/// it to completion) cancels the fan-out it started instead of leaving it
/// to run to completion for nobody.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Uniform error envelope for every non-2xx response this surface returns.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Busy,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Busy => (StatusCode::SERVICE_UNAVAILABLE, "engine is at capacity, try again later".to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        // spec.md §7: an unresolvable bulk-operation target is a 400, not a 404 —
        // the request itself was malformed (it named something that doesn't exist),
        // distinct from a scheduled-job id lookup miss (see `SchedulerError`, below).
        ApiError::BadRequest(e.to_string())
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::UnknownJob(id) => ApiError::NotFound(format!("unknown scheduled job id: {id}")),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PowerVerb {
    On,
    Off,
}

fn parse_power_verb(action: &str) -> Result<PowerVerb, ApiError> {
    match action {
        "on" => Ok(PowerVerb::On),
        "off" => Ok(PowerVerb::Off),
        other => Err(ApiError::BadRequest(format!("unknown action '{other}', expected 'on' or 'off'"))),
    }
}

async fn dispatch(state: &AppState, verb: PowerVerb, target: &DeviceTarget) -> Result<ExecutionReport, ApiError> {
    state.device_manager.check_capacity().await.map_err(|_| ApiError::Busy)?;
    let cancel = state.request_cancel_token();
    let _cancel_on_drop = CancelOnDrop(cancel.clone());
    let report = match verb {
        PowerVerb::On => state.turn_on_with_cancel(target, &cancel).await?,
        PowerVerb::Off => state.turn_off_with_cancel(target, &cancel).await?,
    };
    Ok(report)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub devices_total: usize,
    pub devices_online: usize,
    pub success_rate_24h: f64,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.monitor.snapshot();
    let devices_total = snapshot.len();
    let devices_online = snapshot.iter().filter(|s| s.current_status == DeviceStatus::Online).count();
    let since_ms = SystemClock.epoch_ms().saturating_sub(24 * 60 * 60 * 1000);
    let success_rate_24h = logquery::success_rate_since(&state.log_dir, since_ms);
    Json(HealthResponse {
        status: "ok",
        devices_total,
        devices_online,
        success_rate_24h,
        uptime_seconds: state.uptime().as_secs(),
    })
}

#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub host: String,
    pub port: u16,
    pub status: DeviceStatus,
}

pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<DeviceSummary>> {
    let statuses: HashMap<String, DeviceStatus> =
        state.monitor.snapshot().into_iter().map(|s: DeviceHealthState| (s.device_id.to_string(), s.current_status)).collect();
    let summaries = state
        .registry
        .all()
        .into_iter()
        .map(|d| DeviceSummary {
            id: d.id.to_string(),
            name: d.name.clone(),
            device_type: d.device_type.to_string(),
            host: d.host.clone(),
            port: d.port,
            status: statuses.get(d.id.as_str()).copied().unwrap_or(DeviceStatus::Unknown),
        })
        .collect();
    Json(summaries)
}

pub async fn device_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let verb = parse_power_verb(&action)?;
    let report = dispatch(&state, verb, &DeviceTarget::device(id)).await?;
    Ok(Json(report))
}

pub async fn all_devices_action(State(state): State<AppState>, Path(action): Path<String>) -> Result<Json<ExecutionReport>, ApiError> {
    let verb = parse_power_verb(&action)?;
    let report = dispatch(&state, verb, &DeviceTarget::All).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub device_ids: Vec<String>,
}

pub async fn list_groups(State(state): State<AppState>) -> Json<Vec<GroupSummary>> {
    let summaries = state
        .registry
        .groups()
        .into_iter()
        .map(|g| GroupSummary { id: g.id.to_string(), name: g.name.clone(), device_ids: g.device_ids.iter().cloned().collect() })
        .collect();
    Json(summaries)
}

#[derive(Debug, Serialize)]
pub struct GroupStatus {
    pub id: String,
    pub name: String,
    pub online_count: usize,
    pub offline_count: usize,
    pub total_count: usize,
}

pub async fn groups_status(State(state): State<AppState>) -> Json<Vec<GroupStatus>> {
    let statuses: HashMap<String, DeviceStatus> =
        state.monitor.snapshot().into_iter().map(|s: DeviceHealthState| (s.device_id.to_string(), s.current_status)).collect();
    let summaries = state
        .registry
        .groups()
        .into_iter()
        .map(|g| {
            let total = g.device_ids.len();
            let online = g
                .device_ids
                .iter()
                .filter(|id| statuses.get(id.as_str()).copied() == Some(DeviceStatus::Online))
                .count();
            GroupStatus { id: g.id.to_string(), name: g.name.clone(), online_count: online, offline_count: total - online, total_count: total }
        })
        .collect();
    Json(summaries)
}

pub async fn group_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let verb = parse_power_verb(&action)?;
    let report = dispatch(&state, verb, &DeviceTarget::group(id)).await?;
    Ok(Json(report))
}

pub async fn list_schedule(State(state): State<AppState>) -> Json<Vec<ScheduledJob>> {
    Json(state.scheduler.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub id: Option<String>,
    pub cron_expr: String,
    pub action: ScheduledAction,
    pub target: DeviceTarget,
}

pub async fn upsert_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduledJob>, ApiError> {
    let now_ms = SystemClock.epoch_ms();
    let job = match request.id {
        Some(id) => state.scheduler.update(&id, Some(request.cron_expr), Some(request.action), Some(request.target), now_ms)?,
        None => state.scheduler.create(request.cron_expr, request.action, request.target, now_ms)?,
    };
    Ok(Json(job))
}

pub async fn delete_schedule(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<StatusCode, ApiError> {
    state.scheduler.delete(&job_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn trigger_schedule(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<ExecutionReport>, ApiError> {
    let report = state.trigger_job_now(&job_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub date: Option<String>,
    pub level: Option<String>,
    pub page: Option<usize>,
}

pub async fn logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Result<Json<Vec<ActionRecord>>, ApiError> {
    let date = parse_date(query.date.as_deref())?;
    let records = logquery::query_day(&state.log_dir, date, query.level.as_deref(), query.page.unwrap_or(1));
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub date: Option<String>,
}

pub async fn logs_export(State(state): State<AppState>, Query(query): Query<ExportQuery>) -> Result<String, ApiError> {
    let date = parse_date(query.date.as_deref())?;
    let records = logquery::read_day(&state.log_dir, date);
    let mut body = String::new();
    for record in records {
        let line = serde_json::to_string(&record).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        body.push_str(&line);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub hours: Option<u64>,
}

pub async fn alerts(State(state): State<AppState>, Query(query): Query<AlertsQuery>) -> Result<Json<Vec<AlertEvent>>, ApiError> {
    let hours = query.hours.unwrap_or(24);
    let since_ms = SystemClock.epoch_ms().saturating_sub(hours * 60 * 60 * 1000);
    let since_date = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(since_ms as i64)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let today = chrono::Utc::now().date_naive();

    let mut events = Vec::new();
    let mut date = since_date;
    while date <= today {
        if let Ok(summary) = state.report_store.read_day(date) {
            events.extend(summary.alerts);
        }
        date += chrono::Duration::days(1);
    }
    events.retain(|a: &AlertEvent| a.timestamp_ms >= since_ms);
    Ok(Json(events))
}

fn parse_date(raw: Option<&str>) -> Result<chrono::NaiveDate, ApiError> {
    match raw {
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ApiError::BadRequest(format!("invalid date '{s}', expected YYYY-MM-DD"))),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}
