// SPDX-License-Identifier: MIT

use super::*;
use crate::registry::Registry;
use aquactl_adapters::prober::ProbeResult;
use aquactl_adapters::test_support::FakeProber;
use aquactl_core::{Clock, Device, DeviceType, FakeClock, Group};
use aquactl_storage::ActionLogSink;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::Semaphore;

fn device(id: &str) -> Device {
    Device::builder().id(id).device_type(DeviceType::GenericTcp).build()
}

fn fixture(n: usize) -> (Registry, Arc<FakeProber>, Arc<ActionLogSink>, Arc<aquactl_storage::ReportStore>, tempfile::TempDir) {
    let devices: Vec<Device> = (0..n).map(|i| device(&format!("d{i}"))).collect();
    let registry = Registry::load(devices, Vec::<Group>::new()).unwrap();
    let dir = tempdir().unwrap();
    let fake_prober = Arc::new(FakeProber::new());
    let action_log = Arc::new(ActionLogSink::open(dir.path().join("logs")).unwrap());
    let report_store = Arc::new(aquactl_storage::ReportStore::open(dir.path().join("reports")).unwrap());
    (registry, fake_prober, action_log, report_store, dir)
}

fn prober_for(fake: Arc<FakeProber>) -> ProberFn {
    Arc::new(move |device: &Device| {
        let result = fake.probe(device.id.as_str());
        Box::pin(async move { result })
    })
}

fn ok() -> ProbeResult {
    ProbeResult { reachable: true, latency_ms: 5, detail: "ok".to_string() }
}

fn down() -> ProbeResult {
    ProbeResult { reachable: false, latency_ms: 5, detail: "refused".to_string() }
}

#[tokio::test]
async fn single_isolated_failure_never_flips_to_offline() {
    let (registry, fake, action_log, report_store, _dir) = fixture(1);
    fake.script("d0", [ok(), down(), ok()]);
    let clock = FakeClock::new();
    let monitor = Monitor::new(registry, Arc::new(Semaphore::new(10)), clock.clone(), action_log, report_store, prober_for(fake));

    monitor.run_cycle().await;
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Online));
    let outcome = monitor.run_cycle().await;
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Online));
    assert!(outcome.alert.is_none());
    monitor.run_cycle().await;
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Online));
}

#[tokio::test]
async fn two_consecutive_failures_flip_to_offline_with_warning() {
    let (registry, fake, action_log, report_store, _dir) = fixture(1);
    fake.script("d0", [ok(), down(), down()]);
    let clock = FakeClock::new();
    let monitor = Monitor::new(registry, Arc::new(Semaphore::new(10)), clock.clone(), action_log, report_store, prober_for(fake));

    monitor.run_cycle().await; // ONLINE
    let mid = monitor.run_cycle().await; // 1st failure: still ONLINE, debounced
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Online));
    assert!(mid.alert.is_none());

    let outcome = monitor.run_cycle().await; // 2nd consecutive failure: OFFLINE
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Offline));
    assert_eq!(outcome.alert.as_ref().map(|a| a.level), Some(AlertLevel::Warning));
}

#[tokio::test]
async fn recovery_from_offline_emits_info_alert() {
    let (registry, fake, action_log, report_store, _dir) = fixture(1);
    fake.script("d0", [down(), down(), ok()]);
    let clock = FakeClock::new();
    let monitor = Monitor::new(registry, Arc::new(Semaphore::new(10)), clock.clone(), action_log, report_store, prober_for(fake));

    monitor.run_cycle().await; // UNKNOWN -> OFFLINE immediately (first probe fails)
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Offline));
    monitor.run_cycle().await; // still OFFLINE
    let outcome = monitor.run_cycle().await; // recovers
    assert_eq!(monitor.device_status("d0"), Some(DeviceStatus::Online));
    assert_eq!(outcome.alert.as_ref().map(|a| a.level), Some(AlertLevel::Info));
}

#[tokio::test]
async fn red_alert_fires_when_over_twenty_percent_offline() {
    let (registry, fake, action_log, report_store, _dir) = fixture(10);
    for i in 0..3 {
        fake.script(&format!("d{i}"), [down(), down()]);
    }
    for i in 3..10 {
        fake.script(&format!("d{i}"), [ok(), ok()]);
    }
    let clock = FakeClock::new();
    let monitor = Monitor::new(registry, Arc::new(Semaphore::new(10)), clock.clone(), action_log, report_store, prober_for(fake));

    monitor.run_cycle().await; // first failure for d0..d2, debounced, still ONLINE
    let outcome = monitor.run_cycle().await; // second consecutive failure -> 3 OFFLINE = 30%
    assert_eq!(outcome.sample.offline_count, 3);
    assert_eq!(outcome.alert.as_ref().map(|a| a.level), Some(AlertLevel::RedAlert));
}

#[tokio::test]
async fn exactly_three_offline_of_many_is_critical_not_red_alert() {
    let (registry, fake, action_log, report_store, _dir) = fixture(20);
    for i in 0..3 {
        fake.script(&format!("d{i}"), [down(), down()]);
    }
    for i in 3..20 {
        fake.script(&format!("d{i}"), [ok(), ok()]);
    }
    let clock = FakeClock::new();
    let monitor = Monitor::new(registry, Arc::new(Semaphore::new(10)), clock.clone(), action_log, report_store, prober_for(fake));

    monitor.run_cycle().await;
    let outcome = monitor.run_cycle().await;
    assert_eq!(outcome.sample.offline_count, 3);
    assert_eq!(outcome.alert.as_ref().map(|a| a.level), Some(AlertLevel::Critical));
}

#[tokio::test]
async fn semaphore_bounds_concurrent_probes() {
    let (registry, fake, action_log, report_store, _dir) = fixture(20);
    for i in 0..20 {
        fake.script(&format!("d{i}"), [ok()]);
    }
    let clock = FakeClock::new();
    let semaphore = Arc::new(Semaphore::new(3));
    let monitor = Monitor::new(registry, semaphore.clone(), clock.clone(), action_log, report_store, prober_for(fake));
    monitor.run_cycle().await;
    // All permits returned after the cycle completes.
    assert_eq!(semaphore.available_permits(), 3);
}
