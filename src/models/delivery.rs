use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One row of the append-only attempt log for an event. `attempts` is the
/// 1-indexed ordinal carried on the job that produced this row — never
/// derived by counting prior rows (see `worker`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Delivery {
    pub id: Uuid,
    pub event_id: Uuid,
    pub attempts: i32,
    pub status: i32,
    pub response: Option<String>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Manual-replay audit marker: `attempts=0`, `status=0`,
/// `response="manual replay"`. The first real delivery attempt that follows
/// still records `attempts=1`, so a replayed event's log reads
/// `[0 (marker), 1, 2, ...]`.
pub const REPLAY_MARKER_RESPONSE: &str = "manual replay";
