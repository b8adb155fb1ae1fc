//! The relational index: source of truth for tenant identity, targets, and
//! event/delivery uniqueness. Built on `sqlx` against Postgres, following a
//! plain `FromRow` + hand-written-query style rather than a full ORM.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ApiKey, Delivery, Event, Target, Tenant};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Result of an event admission attempt — tells the caller whether this was
/// the admitting insert (so it alone should enqueue a delivery job) or an
/// already-persisted duplicate (so it should not).
pub struct Admission {
    pub event: Event,
    pub fresh: bool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Tenant operations --

    pub async fn create_tenant(&self, name: &str, token: &str) -> anyhow::Result<Tenant> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (name, token) VALUES ($1, $2) RETURNING id, name, token, signing_secret, created_at",
        )
        .bind(name)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn get_tenant_by_token(&self, token: &str) -> anyhow::Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, token, signing_secret, created_at FROM tenants WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn get_tenant_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, token, signing_secret, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    /// Sets or rotates a tenant's HMAC signing secret (`PUT /tenants/{token}/stripe`).
    pub async fn set_signing_secret(&self, tenant_id: Uuid, secret: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE tenants SET signing_secret = $1 WHERE id = $2")
            .bind(secret)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- API key operations --

    pub async fn create_api_key(&self, tenant_id: Uuid, key_hash: &str) -> anyhow::Result<ApiKey> {
        let key = sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (tenant_id, key_hash) VALUES ($1, $2) RETURNING id, tenant_id, key_hash, created_at",
        )
        .bind(tenant_id)
        .bind(key_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(key)
    }

    /// Resolves the tenant owning the API key with the given hash, if any
    /// and still valid. Used by the bearer-auth extractor.
    pub async fn get_tenant_by_api_key_hash(&self, key_hash: &str) -> anyhow::Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.id, t.name, t.token, t.signing_secret, t.created_at
            FROM tenants t
            JOIN api_keys k ON k.tenant_id = t.id
            WHERE k.key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    // -- Target operations --

    pub async fn upsert_target(
        &self,
        tenant_id: Uuid,
        url: &str,
        headers: Option<&Value>,
        provider: &str,
    ) -> anyhow::Result<Target> {
        let target = sqlx::query_as::<_, Target>(
            r#"
            INSERT INTO targets (tenant_id, url, headers, provider)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id) DO UPDATE
                SET url = EXCLUDED.url,
                    headers = EXCLUDED.headers,
                    provider = EXCLUDED.provider,
                    updated_at = now()
            RETURNING id, tenant_id, url, headers, provider, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(url)
        .bind(headers)
        .bind(provider)
        .fetch_one(&self.pool)
        .await?;
        Ok(target)
    }

    pub async fn get_target_by_tenant(&self, tenant_id: Uuid) -> anyhow::Result<Option<Target>> {
        let target = sqlx::query_as::<_, Target>(
            "SELECT id, tenant_id, url, headers, provider, created_at, updated_at FROM targets WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(target)
    }

    // -- Event operations --

    /// Admits an event, enforcing at-most-one row per `(tenant_id, fingerprint)`.
    ///
    /// Serializes concurrent duplicate admissions via the `UNIQUE(tenant_id,
    /// fingerprint)` constraint rather than a read-then-write check: the
    /// insert is attempted first, and a unique-violation falls back to
    /// selecting the row that won the race. This is the only way to get
    /// "exactly one row per fingerprint" under true concurrency — a
    /// SELECT-then-INSERT has a TOCTOU window two simultaneous requests can
    /// both pass.
    pub async fn admit_event(
        &self,
        tenant_id: Uuid,
        fingerprint: &str,
        payload: &Value,
    ) -> anyhow::Result<Admission> {
        let inserted = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (tenant_id, fingerprint, payload, duplicate)
            VALUES ($1, $2, $3, false)
            ON CONFLICT (tenant_id, fingerprint) DO NOTHING
            RETURNING id, tenant_id, fingerprint, payload, duplicate, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(fingerprint)
        .bind(payload)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(event) = inserted {
            return Ok(Admission {
                event,
                fresh: true,
            });
        }

        // Another concurrent request already admitted this fingerprint.
        let existing = sqlx::query_as::<_, Event>(
            "SELECT id, tenant_id, fingerprint, payload, duplicate, created_at FROM events WHERE tenant_id = $1 AND fingerprint = $2",
        )
        .bind(tenant_id)
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await?;

        Ok(Admission {
            event: existing,
            fresh: false,
        })
    }

    pub async fn get_event(&self, event_id: Uuid) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, tenant_id, fingerprint, payload, duplicate, created_at FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    // -- Delivery operations --

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_delivery(
        &self,
        event_id: Uuid,
        attempts: i32,
        status: i32,
        response: Option<&str>,
        next_run: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Delivery> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            INSERT INTO deliveries (event_id, attempts, status, response, next_run)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, event_id, attempts, status, response, next_run, created_at
            "#,
        )
        .bind(event_id)
        .bind(attempts)
        .bind(status)
        .bind(response)
        .bind(next_run)
        .fetch_one(&self.pool)
        .await?;
        Ok(delivery)
    }

    pub async fn list_deliveries(&self, event_id: Uuid) -> anyhow::Result<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, Delivery>(
            "SELECT id, event_id, attempts, status, response, next_run, created_at FROM deliveries WHERE event_id = $1 ORDER BY attempts ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
