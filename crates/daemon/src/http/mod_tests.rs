// SPDX-License-Identifier: MIT

use super::*;
use crate::config::DaemonConfig;
use aquactl_adapters::test_support::{FakeAdapter, FakeProber};
use aquactl_core::DeviceType;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_config(dir: &std::path::Path) -> DaemonConfig {
    let config_path = dir.join("config.toml");
    let body = format!(
        r#"
schedule_db_path = "{schedule}"
report_dir = "{reports}"
log_dir = "{logs}"

[[devices]]
id = "proj1"
name = "Main Projector"
type = "generic_tcp"
host = "127.0.0.1"
port = 9000
group_ids = ["exhibit"]

[[groups]]
id = "exhibit"
name = "Exhibit Hall"
device_ids = ["proj1"]
"#,
        schedule = dir.join("schedule.json").display(),
        reports = dir.join("reports").display(),
        logs = dir.join("logs").display(),
    );
    std::fs::write(&config_path, body).expect("write fixture config");
    DaemonConfig::load(&config_path).expect("load fixture config")
}

fn fake_resolver(adapter: Arc<FakeAdapter>) -> aquactl_engine::AdapterResolver {
    Arc::new(move |_device_type: DeviceType| -> aquactl_engine::SharedAdapter { adapter.clone() })
}

fn fake_prober(prober: Arc<FakeProber>) -> aquactl_engine::ProberFn {
    Arc::new(move |device: &aquactl_core::Device| {
        let result = prober.probe(device.id.as_str());
        Box::pin(async move { result })
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn health_reports_fleet_totals() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    let app = router(engine);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["devices_total"], 1);
}

#[tokio::test]
async fn list_devices_reflects_the_registry() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    let app = router(engine);

    let response = app.oneshot(Request::builder().uri("/devices").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().expect("array").len(), 1);
    assert_eq!(body[0]["id"], "proj1");
}

#[tokio::test]
async fn turning_a_device_on_dispatches_through_the_adapter() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let adapter = Arc::new(FakeAdapter::new());
    let engine = Arc::new(Engine::build_with(&config, fake_resolver(adapter.clone()), fake_prober(Arc::new(FakeProber::new()))).expect("engine builds"));
    let app = router(engine);

    let response = app
        .oneshot(Request::builder().method("POST").uri("/devices/proj1/on").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success_count"], 1);
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn turning_on_an_unknown_device_is_a_bad_request() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    let app = router(engine);

    let response = app
        .oneshot(Request::builder().method("POST").uri("/devices/ghost/on").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn an_unrecognized_action_verb_is_a_bad_request() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    let app = router(engine);

    let response = app
        .oneshot(Request::builder().method("POST").uri("/devices/proj1/sideways").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn groups_status_aggregates_member_health() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    engine.run_monitor_cycle().await;
    let app = router(engine);

    let response = app.oneshot(Request::builder().uri("/groups/status").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["id"], "exhibit");
    assert_eq!(body[0]["online_count"], 1);
}

#[tokio::test]
async fn schedule_lifecycle_create_trigger_and_delete() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let adapter = Arc::new(FakeAdapter::new());
    let engine = Arc::new(Engine::build_with(&config, fake_resolver(adapter.clone()), fake_prober(Arc::new(FakeProber::new()))).expect("engine builds"));
    let app = router(engine);

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/schedule")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"cron_expr":"0 21 * * *","action":"TURN_OFF","target":"all"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(create.status(), StatusCode::OK);
    let created = body_json(create).await;
    let job_id = created["id"].as_str().expect("job id").to_string();

    let list = app.clone().oneshot(Request::builder().uri("/schedule").body(Body::empty()).expect("request")).await.expect("response");
    let jobs = body_json(list).await;
    assert_eq!(jobs.as_array().expect("array").len(), 1);

    let trigger = app
        .clone()
        .oneshot(Request::builder().method("POST").uri(format!("/schedule/{job_id}/trigger")).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(trigger.status(), StatusCode::OK);
    assert_eq!(adapter.calls().len(), 1);

    let delete = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(format!("/schedule/{job_id}")).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let delete_again = app
        .oneshot(Request::builder().method("DELETE").uri(format!("/schedule/{job_id}")).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(delete_again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logs_endpoint_returns_todays_records_after_an_action() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    engine.turn_on(&aquactl_core::DeviceTarget::device("proj1")).await.expect("turn on");
    let app = router(engine);

    let response = app.oneshot(Request::builder().uri("/logs").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn alerts_endpoint_is_empty_when_nothing_has_gone_offline() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let engine = Arc::new(
        Engine::build_with(&config, fake_resolver(Arc::new(FakeAdapter::new())), fake_prober(Arc::new(FakeProber::new())))
            .expect("engine builds"),
    );
    engine.run_monitor_cycle().await;
    let app = router(engine);

    let response = app.oneshot(Request::builder().uri("/alerts").body(Body::empty()).expect("request")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.as_array().expect("array").is_empty());
}
