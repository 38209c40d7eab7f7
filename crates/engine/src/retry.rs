// SPDX-License-Identifier: MIT

//! Retry Executor (§4.3): wraps one `ProtocolAdapter` call with bounded
//! retries and the backoff schedule in `RetryPolicy`.
//!
//! A `PROTOCOL_ERROR` is treated as non-retriable here in every case, not
//! only the "malformed configuration" examples the design notes call out —
//! the adapter trait has no channel to tell the executor which `PROTOCOL_ERROR`
//! came from a bad MAC versus an unexpected ack token, and retrying a
//! protocol mismatch is never going to succeed either way (see DESIGN.md).

use aquactl_adapters::ProtocolAdapter;
use aquactl_core::{ActionKind, ActionRecord, AdapterError, Clock, Device, Outcome, RetryPolicy};
use tokio_util::sync::CancellationToken;
use std::time::Duration;

pub async fn execute<C: Clock>(
    adapter: &dyn ProtocolAdapter,
    device: &Device,
    action: ActionKind,
    policy: &RetryPolicy,
    clock: &C,
    cancel: &CancellationToken,
) -> ActionRecord {
    let timestamp_ms = clock.epoch_ms();
    let started = clock.now();

    let mut attempts = 0u32;
    let mut outcome = Outcome::Fail;
    let mut error_message = None;
    let mut cancelled = false;

    while attempts < policy.max_attempts.max(1) {
        attempts += 1;

        if attempts > 1 {
            let delay = policy.delay_before_attempt(attempts);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = clock.sleep(delay) => {}
            }
        }

        let timeout = policy.per_attempt_timeout();
        match invoke(adapter, device, action, timeout, cancel).await {
            Ok(()) => {
                outcome = Outcome::Success;
                error_message = None;
                break;
            }
            Err(err) => {
                outcome = classify(err);
                error_message = Some(err.to_string());
            }
        }

        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        if outcome == Outcome::ProtocolError {
            break;
        }
    }

    let duration_ms = clock.now().saturating_duration_since(started).as_millis() as u64;
    ActionRecord {
        timestamp_ms,
        device_id: device.id.clone(),
        action,
        attempts,
        outcome,
        duration_ms,
        error_message,
        cancelled,
    }
}

async fn invoke(
    adapter: &dyn ProtocolAdapter,
    device: &Device,
    action: ActionKind,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), AdapterError> {
    match action {
        ActionKind::TurnOn => adapter.power_on(device, timeout, cancel).await,
        ActionKind::TurnOff => adapter.power_off(device, timeout, cancel).await,
        ActionKind::Query => adapter.query_power(device, timeout, cancel).await.map(|_| ()),
        ActionKind::Probe => unreachable!("probes go through the Health Prober, not the Retry Executor"),
    }
}

fn classify(err: AdapterError) -> Outcome {
    match err {
        AdapterError::Unreachable => Outcome::Unreachable,
        AdapterError::Timeout => Outcome::Timeout,
        AdapterError::Protocol => Outcome::ProtocolError,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
