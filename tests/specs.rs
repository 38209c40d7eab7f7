// SPDX-License-Identifier: MIT

//! End-to-end scenarios exercising the Device Manager, Scheduler, and
//! Monitor together, the way the HTTP surface would drive them, but without
//! an axum router in the loop.

use aquactl_adapters::test_support::{FakeAdapter, FakeProber};
use aquactl_core::{
    AdapterError, Device, DeviceTarget, FakeClock, Group, Outcome, RetryPolicy, ScheduledAction,
};
use aquactl_engine::{AdapterResolver, DeviceManager, Monitor, ProberFn, Registry, Scheduler, SharedAdapter};
use aquactl_storage::{ActionLogSink, ReportStore, ScheduleStore};
use aquactl_adapters::prober::ProbeResult;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn resolver(adapter: Arc<FakeAdapter>) -> AdapterResolver {
    Arc::new(move |_device_type| -> SharedAdapter { adapter.clone() })
}

fn prober_fn(prober: Arc<FakeProber>) -> ProberFn {
    Arc::new(move |device: &Device| {
        let result = prober.probe(device.id.as_str());
        Box::pin(async move { result })
    })
}

fn telnet_device(id: &str) -> Device {
    Device::builder()
        .id(id)
        .name(format!("Device {id}"))
        .device_type(aquactl_core::DeviceType::GenericTcp)
        .host("127.0.0.1")
        .port(9000)
        .build()
}

/// S1. Bulk turn-on, all succeed: fan-out is parallel, not sequential.
#[tokio::test]
async fn s1_bulk_turn_on_all_succeed_is_parallel() {
    let dir = tempdir().expect("tempdir");
    let devices = vec![telnet_device("d1"), telnet_device("d2"), telnet_device("d3")];
    let registry = Registry::load(devices, vec![]).expect("registry loads");
    let adapter = Arc::new(FakeAdapter::new());
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let clock = FakeClock::new();
    let manager = DeviceManager::new(registry, 10, RetryPolicy::default(), clock, action_log, resolver(adapter.clone()));

    let started = std::time::Instant::now();
    let report = manager.turn_on(&DeviceTarget::All, &CancellationToken::new()).await.expect("turn_on resolves");
    let wall_time = started.elapsed();

    assert_eq!(report.success_count, 3);
    assert_eq!(report.results.len(), 3);
    assert!(wall_time < std::time::Duration::from_millis(500), "fan-out should run concurrently, took {wall_time:?}");
}

/// S2 / S3. Partial failure and retry-succeeds-on-attempt-2 both hinge on
/// the same backoff math; exercised together against a `FakeClock` so the
/// assertions are on simulated, not wall-clock, time.
#[tokio::test]
async fn s2_partial_failure_retries_the_failing_device_to_exhaustion() {
    let dir = tempdir().expect("tempdir");
    let devices = vec![telnet_device("d1"), telnet_device("d2"), telnet_device("d3")];
    let registry = Registry::load(devices, vec![]).expect("registry loads");
    let adapter = Arc::new(FakeAdapter::new());
    adapter.script_power_on("d2", vec![Err(AdapterError::Unreachable), Err(AdapterError::Unreachable), Err(AdapterError::Unreachable)]);
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let clock = FakeClock::new();
    let manager = DeviceManager::new(registry, 10, RetryPolicy::default(), clock, action_log, resolver(adapter));

    let report = manager.turn_on(&DeviceTarget::All, &CancellationToken::new()).await.expect("turn_on resolves");

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    let d1 = &report.results[&aquactl_core::DeviceId::from("d1")];
    assert_eq!(d1.outcome, Outcome::Success);
    assert_eq!(d1.attempts, 1);
    let d2 = &report.results[&aquactl_core::DeviceId::from("d2")];
    assert_eq!(d2.outcome, Outcome::Unreachable);
    assert_eq!(d2.attempts, 3);
    // base=30s, mult=2: delay before attempt 2 is 30s, before attempt 3 is 60s.
    assert!(d2.duration_ms >= 90_000, "expected at least 90s of simulated backoff, got {}ms", d2.duration_ms);
}

#[tokio::test]
async fn s3_retry_succeeds_on_second_attempt() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::load(vec![telnet_device("d1")], vec![]).expect("registry loads");
    let adapter = Arc::new(FakeAdapter::new());
    adapter.script_power_on("d1", vec![Err(AdapterError::Unreachable), Ok(())]);
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let clock = FakeClock::new();
    let manager = DeviceManager::new(registry, 10, RetryPolicy::default(), clock, action_log, resolver(adapter));

    let report = manager.turn_on(&DeviceTarget::device("d1"), &CancellationToken::new()).await.expect("turn_on resolves");

    let record = &report.results[&aquactl_core::DeviceId::from("d1")];
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.attempts, 2);
    assert!(record.duration_ms >= 30_000);
}

/// S4. Scheduler fires turn-off at 21:00 local time and the fired job's
/// report lands in the day's report file.
#[tokio::test]
async fn s4_scheduler_fires_turn_off_at_configured_time() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::load(vec![telnet_device("d1")], vec![]).expect("registry loads");
    let adapter = Arc::new(FakeAdapter::new());
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let report_store = Arc::new(ReportStore::open(dir.path().join("reports")).expect("report store opens"));
    let schedule_store = Arc::new(ScheduleStore::open(dir.path().join("schedule.json")).expect("schedule store opens"));
    let clock = FakeClock::new();
    let manager = Arc::new(DeviceManager::new(registry, 10, RetryPolicy::default(), clock.clone(), action_log, resolver(adapter.clone())));

    let scheduler = Scheduler::load(schedule_store, chrono_tz::UTC, clock.epoch_ms()).expect("scheduler loads");
    let job = scheduler.create("0 21 * * *".to_string(), ScheduledAction::TurnOff, DeviceTarget::All, clock.epoch_ms()).expect("job created");
    assert!(job.next_run_ms.is_some());

    // Advance the clock to the job's computed fire time.
    let next_run_ms = job.next_run_ms.expect("next_run_ms computed");
    let delta_ms = next_run_ms.saturating_sub(clock.epoch_ms());
    clock.advance(std::time::Duration::from_millis(delta_ms));

    let due = scheduler.due_jobs(clock.epoch_ms());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].action, ScheduledAction::TurnOff);

    let report = manager.turn_off(&due[0].target, &CancellationToken::new()).await.expect("turn_off resolves");
    report_store.append_execution(&report).expect("report persisted");
    assert_eq!(adapter.calls().iter().filter(|(_, call)| matches!(call, aquactl_adapters::test_support::Call::PowerOff)).count(), 1);

    let today = chrono::Utc::now().date_naive();
    let summary = report_store.read_day(today).expect("read today's report file");
    assert_eq!(summary.executions.len(), 1);
}

/// S5. Monitor debounce: a single isolated failed probe never flips an
/// ONLINE device to OFFLINE; two consecutive failures does.
#[tokio::test]
async fn s5_monitor_debounces_a_single_failed_probe() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::load(vec![telnet_device("d1")], vec![]).expect("registry loads");
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let report_store = Arc::new(ReportStore::open(dir.path().join("reports")).expect("report store opens"));
    let prober = Arc::new(FakeProber::new());
    let clock = FakeClock::new();

    let ok = ProbeResult { reachable: true, latency_ms: 1, detail: "ok".to_string() };
    let fail = ProbeResult { reachable: false, latency_ms: 0, detail: "refused".to_string() };
    prober.script("d1", vec![ok.clone(), fail.clone(), ok.clone()]);

    let monitor = Monitor::new(registry, Arc::new(tokio::sync::Semaphore::new(10)), clock, action_log, report_store, prober_fn(prober));

    let c1 = monitor.run_cycle().await;
    assert!(c1.alert.is_none());
    let c2 = monitor.run_cycle().await;
    assert!(c2.alert.is_none(), "a single failed probe must not trigger an alert");
    assert_eq!(monitor.device_status("d1"), Some(aquactl_core::DeviceStatus::Online));
    let c3 = monitor.run_cycle().await;
    assert!(c3.alert.is_none());
    assert_eq!(monitor.device_status("d1"), Some(aquactl_core::DeviceStatus::Online));
}

#[tokio::test]
async fn s5_monitor_flips_offline_on_second_consecutive_failure() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::load(vec![telnet_device("d1")], vec![]).expect("registry loads");
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let report_store = Arc::new(ReportStore::open(dir.path().join("reports")).expect("report store opens"));
    let prober = Arc::new(FakeProber::new());
    let clock = FakeClock::new();

    let ok = ProbeResult { reachable: true, latency_ms: 1, detail: "ok".to_string() };
    let fail = ProbeResult { reachable: false, latency_ms: 0, detail: "refused".to_string() };
    prober.script("d1", vec![ok, fail.clone(), fail]);

    let monitor = Monitor::new(registry, Arc::new(tokio::sync::Semaphore::new(10)), clock, action_log, report_store, prober_fn(prober));

    let c1 = monitor.run_cycle().await;
    assert!(c1.alert.is_none());
    let c2 = monitor.run_cycle().await;
    assert!(c2.alert.is_none(), "first failure is debounced, not alerted");
    assert_eq!(monitor.device_status("d1"), Some(aquactl_core::DeviceStatus::Online));
    let c3 = monitor.run_cycle().await;
    assert_eq!(monitor.device_status("d1"), Some(aquactl_core::DeviceStatus::Offline));
    let alert = c3.alert.expect("second consecutive failure raises a warning");
    assert_eq!(alert.level, aquactl_core::AlertLevel::Warning);
}

/// S6. RED_ALERT: 3 of 10 devices unreachable for two consecutive cycles.
#[tokio::test]
async fn s6_red_alert_when_fleet_offline_ratio_exceeds_threshold() {
    let dir = tempdir().expect("tempdir");
    let devices: Vec<Device> = (0..10).map(|i| telnet_device(&format!("d{i}"))).collect();
    let registry = Registry::load(devices, vec![]).expect("registry loads");
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).expect("action log opens"));
    let report_store = Arc::new(ReportStore::open(dir.path().join("reports")).expect("report store opens"));
    let prober = Arc::new(FakeProber::new());
    let clock = FakeClock::new();

    let ok = ProbeResult { reachable: true, latency_ms: 1, detail: "ok".to_string() };
    let fail = ProbeResult { reachable: false, latency_ms: 0, detail: "refused".to_string() };
    for i in 0..3 {
        prober.script(&format!("d{i}"), vec![fail.clone(), fail.clone()]);
    }
    for i in 3..10 {
        prober.script(&format!("d{i}"), vec![ok.clone(), ok.clone()]);
    }

    let monitor = Monitor::new(registry, Arc::new(tokio::sync::Semaphore::new(10)), clock, action_log, report_store, prober_fn(prober));

    let c1 = monitor.run_cycle().await;
    assert!(c1.alert.is_none(), "first cycle's failures are still debounced");
    let c2 = monitor.run_cycle().await;
    let alert = c2.alert.expect("second consecutive cycle of 3/10 offline raises RED_ALERT");
    assert_eq!(alert.level, aquactl_core::AlertLevel::RedAlert);
    assert_eq!(alert.offline_count, 3);
    assert_eq!(alert.total_count, 10);
}

/// S7. Round-trip: loading a configuration document, validating it into a
/// `Registry`, and reloading the same source yields byte-equivalent device
/// and group sets.
#[tokio::test]
async fn s7_config_round_trip_is_byte_equivalent() {
    let devices = vec![telnet_device("d1"), telnet_device("d2")];
    let group_ids = vec!["d1".to_string(), "d2".to_string()];
    let groups = vec![Group { id: aquactl_core::GroupId::from("exhibit"), name: "Exhibit Hall".to_string(), device_ids: group_ids }];

    let first = Registry::load(devices.clone(), groups.clone()).expect("first load");
    let reserialized_devices = serde_json::to_string(&first.all()).expect("serialize devices");
    let reserialized_groups = serde_json::to_string(&first.groups()).expect("serialize groups");

    let second = Registry::load(devices, groups).expect("second load");
    let second_devices = serde_json::to_string(&second.all()).expect("serialize devices again");
    let second_groups = serde_json::to_string(&second.groups()).expect("serialize groups again");

    assert_eq!(reserialized_devices, second_devices);
    assert_eq!(reserialized_groups, second_groups);
}

/// S8. Scheduler durability: a job created before a simulated restart fires
/// exactly once after the store is reloaded into a fresh `Scheduler`.
#[tokio::test]
async fn s8_scheduler_durability_across_restart() {
    let dir = tempdir().expect("tempdir");
    let schedule_path = dir.path().join("schedule.json");

    let clock = FakeClock::new();
    let store = Arc::new(ScheduleStore::open(&schedule_path).expect("schedule store opens"));
    let scheduler = Scheduler::load(store, chrono_tz::UTC, clock.epoch_ms()).expect("scheduler loads");
    let job = scheduler.create("0 21 * * *".to_string(), ScheduledAction::TurnOff, DeviceTarget::All, clock.epoch_ms()).expect("job created");
    drop(scheduler);

    // Simulate a restart: a fresh `ScheduleStore` and `Scheduler` over the
    // same durable file.
    let restarted_store = Arc::new(ScheduleStore::open(&schedule_path).expect("schedule store reopens"));
    let restarted_scheduler = Scheduler::load(restarted_store, chrono_tz::UTC, clock.epoch_ms()).expect("scheduler reloads");
    let reloaded = restarted_scheduler.get(job.id.as_str()).expect("job survived the restart");
    assert_eq!(reloaded.next_run_ms, job.next_run_ms);

    let delta_ms = reloaded.next_run_ms.expect("has a next run").saturating_sub(clock.epoch_ms());
    clock.advance(std::time::Duration::from_millis(delta_ms));

    let due_first = restarted_scheduler.due_jobs(clock.epoch_ms());
    assert_eq!(due_first.len(), 1, "the job should fire exactly once at its scheduled time");

    let due_again = restarted_scheduler.due_jobs(clock.epoch_ms());
    assert!(due_again.is_empty(), "a job that already fired must not refire before its next occurrence");
}
