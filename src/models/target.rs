use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// The tenant's single delivery destination. Upsert semantics: one row per
/// tenant, mutated in place by `POST /targets` rather than appended to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Target {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub url: String,
    pub headers: Option<Value>,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
