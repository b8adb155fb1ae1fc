//! Delivery worker — the retrying outbound-delivery loop.
//!
//! Runs as a long-lived background task inside the server process, spawned
//! at startup rather than a separate process group: nothing in the pipeline
//! depends on cross-process isolation, only on the queue being durable and
//! the worker tolerating crash/restart.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::queue::DeliveryJob;
use crate::state::AppState;

pub const BASE_DELAY_SECS: i64 = 30;
pub const MAX_ATTEMPTS: u32 = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const CLAIM_BATCH: isize = 16;
const RESPONSE_EXCERPT_LEN: usize = 2048;

/// Spawns the worker loop. Call once at startup; the returned handle is not
/// awaited by the caller — the server shuts down via process exit.
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build delivery HTTP client");

        loop {
            let now_millis = now_millis();
            match state.queue.claim_ready(now_millis, CLAIM_BATCH).await {
                Ok(jobs) => {
                    for job in jobs {
                        if let Err(e) = process_job(&state, &client, &job).await {
                            tracing::error!(
                                event_id = %job.event_id,
                                attempt = job.attempt,
                                error = %e,
                                "delivery worker: unexpected error processing job"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "delivery worker: failed to claim jobs");
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    });
}

/// Processes a single claimed job to completion: loads the event and
/// target, performs the outbound POST, records the outcome, and schedules
/// (or doesn't) the next attempt.
///
/// `EventNotFound` and `NoTarget` are terminal and intentionally produce no
/// delivery row — the worker logs and moves on rather than crashing the
/// process. In every branch, `state.queue.complete(job)` is the last thing
/// this function does for that job — it only runs after the outcome (a
/// terminal drop, or a committed Delivery row plus, on retry, a committed
/// next-attempt job) is durable, so a crash anywhere earlier leaves the job
/// on its lease to be reclaimed and retried rather than silently dropped.
async fn process_job(state: &AppState, client: &Client, job: &DeliveryJob) -> anyhow::Result<()> {
    let event = match state.db.get_event(job.event_id).await? {
        Some(event) => event,
        None => {
            tracing::warn!(event_id = %job.event_id, "delivery worker: event not found, dropping job");
            state.queue.complete(job).await?;
            return Ok(());
        }
    };

    let target = match state.db.get_target_by_tenant(event.tenant_id).await? {
        Some(target) => target,
        None => {
            tracing::warn!(
                event_id = %event.id,
                tenant_id = %event.tenant_id,
                "delivery worker: tenant has no target, dropping job"
            );
            state.queue.complete(job).await?;
            return Ok(());
        }
    };

    let outcome = post_event(client, &target.url, target.headers.as_ref(), &event.payload).await;

    let (status, response_excerpt) = match &outcome {
        Ok(status) => (*status as i32, None),
        Err(e) => (0, Some(truncate(&e.to_string(), RESPONSE_EXCERPT_LEN))),
    };

    let success = matches!(&outcome, Ok(status) if (200..300).contains(status));
    let attempt = job.attempt;

    let next_run = if !success && attempt < MAX_ATTEMPTS {
        let delay_secs = BASE_DELAY_SECS * 2i64.pow(attempt - 1);
        Some(Utc::now() + chrono::Duration::seconds(delay_secs))
    } else {
        None
    };

    state
        .db
        .insert_delivery(
            event.id,
            attempt as i32,
            status,
            response_excerpt.as_deref(),
            next_run,
        )
        .await?;

    if let Some(next_run) = next_run {
        let next_job = DeliveryJob {
            event_id: event.id,
            attempt: attempt + 1,
        };
        state
            .queue
            .enqueue_at(&next_job, next_run.timestamp_millis())
            .await?;
    }

    state.queue.complete(job).await?;

    Ok(())
}

/// Performs the outbound POST. `Ok(status)` on any response received
/// (including non-2xx — the caller decides success from the status code);
/// `Err` only for transport-level failure (connect refused, DNS, timeout),
/// which the caller records as synthetic `status=0`.
async fn post_event(
    client: &Client,
    url: &str,
    headers: Option<&Value>,
    payload: &Value,
) -> anyhow::Result<u16> {
    let mut req = client.post(url).json(payload);

    if let Some(Value::Object(map)) = headers {
        for (key, value) in map {
            if let Some(value) = value.as_str() {
                req = req.header(key.as_str(), value);
            }
        }
    }

    let resp = req.send().await?;
    Ok(resp.status().as_u16())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_doubles_from_base_delay() {
        let delays: Vec<i64> = (1..MAX_ATTEMPTS)
            .map(|attempt| BASE_DELAY_SECS * 2i64.pow(attempt - 1))
            .collect();
        assert_eq!(delays, vec![30, 60, 120, 240]);
    }

    #[test]
    fn response_excerpt_is_truncated() {
        let long = "x".repeat(RESPONSE_EXCERPT_LEN + 100);
        let truncated = truncate(&long, RESPONSE_EXCERPT_LEN);
        assert_eq!(truncated.len(), RESPONSE_EXCERPT_LEN);
    }

    #[test]
    fn short_response_is_not_truncated() {
        assert_eq!(truncate("short", RESPONSE_EXCERPT_LEN), "short");
    }
}
