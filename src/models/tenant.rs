use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A customer account: owns one ingress token, zero or more API keys, one
/// target, and many events. Created by `/signup`; the signing secret is set
/// separately via `PUT /tenants/{token}/stripe`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub token: String,
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Generates a URL-safe public ingress token. Not a secret — the HMAC
    /// signature is what authenticates a request, the token only routes it.
    pub fn new_token() -> String {
        crate::util::random_urlsafe(16)
    }
}
