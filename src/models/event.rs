use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Immutable once persisted. `(tenant_id, fingerprint)` is unique — the
/// ingress must never create a second row for the same pair.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub fingerprint: String,
    pub payload: Value,
    pub duplicate: bool,
    pub created_at: DateTime<Utc>,
}

/// The minimal wire schema an ingress body must conform to. Extra top-level
/// fields are rejected (`deny_unknown_fields`) — `data` is the only place a
/// provider can carry arbitrary structure. The whole parsed value, not just
/// `data`, is what gets stored as `Event::payload` and forwarded verbatim.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngressPayload {
    pub id: String,
    pub event: String,
    #[serde(default)]
    pub data: Option<Value>,
}
