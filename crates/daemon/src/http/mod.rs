// SPDX-License-Identifier: MIT

//! HTTP control surface (§6): one axum `Router` over a shared [`Engine`].

mod handlers;

use crate::engine::Engine;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub type AppState = Arc<Engine>;

/// Builds the router. Split out from `main` so integration tests can drive
/// it directly with `tower::ServiceExt::oneshot` without binding a socket.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/devices", get(handlers::list_devices))
        .route("/devices/all/{action}", post(handlers::all_devices_action))
        .route("/devices/{id}/{action}", post(handlers::device_action))
        .route("/groups", get(handlers::list_groups))
        .route("/groups/status", get(handlers::groups_status))
        .route("/groups/{id}/{action}", post(handlers::group_action))
        .route("/schedule", get(handlers::list_schedule).post(handlers::upsert_schedule))
        .route("/schedule/{job_id}", delete(handlers::delete_schedule))
        .route("/schedule/{job_id}/trigger", post(handlers::trigger_schedule))
        .route("/logs", get(handlers::logs))
        .route("/logs/export", get(handlers::logs_export))
        .route("/alerts", get(handlers::alerts))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
