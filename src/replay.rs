//! Replay endpoint — `POST /events/{event_id}/replay`.
//!
//! Re-enqueues an existing, already-persisted event for delivery. Does not
//! touch the event row itself (events are immutable); only appends an audit
//! marker to the delivery log and schedules a fresh attempt chain starting
//! at `attempt=1`.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::api::AuthContext;
use crate::errors::AppError;
use crate::models::delivery::REPLAY_MARKER_RESPONSE;
use crate::queue::DeliveryJob;
use crate::state::AppState;

pub async fn replay(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = state
        .db
        .get_event(event_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if event.tenant_id != auth.tenant.id {
        return Err(AppError::NotFound);
    }

    // Audit marker: `attempts=0` never counts toward MAX_ATTEMPTS; the real
    // chain that follows still starts at 1.
    state
        .db
        .insert_delivery(event.id, 0, 0, Some(REPLAY_MARKER_RESPONSE), None)
        .await?;

    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as i64;

    let job = DeliveryJob {
        event_id: event.id,
        attempt: 1,
    };
    state.queue.enqueue_at(&job, now_millis).await?;

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "event_id": event.id })),
    ))
}
