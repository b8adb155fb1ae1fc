use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A bearer credential for authenticated management endpoints. Only a salted
/// hash of the issued secret is ever persisted; the raw secret is returned to
/// the caller exactly once, at issuance.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Hashes a raw bearer secret for storage/lookup. Salted with a
/// deployment-wide pepper (`API_KEY_SALT`) so a leaked `key_hash` column
/// alone can't be brute-forced offline against a guessed secret space.
pub fn hash_key(raw: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new raw API key secret, e.g. `wr_<22 random url-safe chars>`.
pub fn new_raw_key() -> String {
    format!("wr_{}", crate::util::random_urlsafe(24))
}
