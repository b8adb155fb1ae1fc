//! Rate limiter — two independent sliding-window counters: a coarse
//! per-IP limit guarding the whole service, and a per-tenant limit guarding
//! each signing secret's ingress endpoint.
//!
//! Both counters normally live in Redis, using the same atomic INCR+EXPIRE
//! pattern so a burst of concurrent requests across multiple workers still
//! serializes on a single counter per window — Redis applies the Lua script
//! as one atomic unit, so there's no read-then-write race between checking
//! and incrementing.
//!
//! If Redis cannot be reached at startup, `connect` falls back to an
//! in-process counter instead of failing the whole server. This is strictly
//! weaker — each process instance enforces its own limit rather than a
//! shared one, so a fleet of N instances behind a load balancer effectively
//! allows N times the configured budget — and is only correct for a
//! single-instance deployment. The fallback exists so a transient Redis
//! outage at startup degrades rate limiting instead of taking down ingress
//! entirely; it is logged loudly, not silently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;

pub const GLOBAL_LIMIT: u64 = 100;
pub const GLOBAL_WINDOW_SECS: u64 = 60;
pub const TENANT_LIMIT: u64 = 30;
pub const TENANT_WINDOW_SECS: u64 = 60;

#[derive(Clone)]
pub enum RateLimiter {
    Redis(ConnectionManager),
    InMemory(Arc<Mutex<HashMap<String, (u64, Instant)>>>),
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::Redis(redis)
    }

    /// Per-process counters, no shared state. See module docs for the
    /// tradeoff this makes against the Redis-backed limiter.
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Connects to Redis for rate limiting, falling back to `in_memory()`
    /// with a loud log line if the connection cannot be established.
    pub async fn connect(redis_url: &str) -> Self {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => Self::Redis(conn),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "rate limiter: failed to connect to redis at startup, \
                         falling back to in-process counters (single-instance only)"
                    );
                    Self::in_memory()
                }
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "rate limiter: invalid redis url, \
                     falling back to in-process counters (single-instance only)"
                );
                Self::in_memory()
            }
        }
    }

    /// Increments the counter for `key` and, on the first hit in the
    /// window, sets it to expire after `window_secs`. Returns the count
    /// *after* this increment.
    async fn incr(&self, key: &str, window_secs: u64) -> anyhow::Result<u64> {
        match self {
            Self::Redis(redis) => {
                let mut conn = redis.clone();
                let script = redis::Script::new(
                    r#"
                    local current = redis.call("INCR", KEYS[1])
                    if current == 1 then
                        redis.call("EXPIRE", KEYS[1], ARGV[1])
                    end
                    return current
                    "#,
                );
                let count: u64 = script
                    .key(key)
                    .arg(window_secs)
                    .invoke_async(&mut conn)
                    .await?;
                Ok(count)
            }
            Self::InMemory(counters) => {
                let window = Duration::from_secs(window_secs);
                let mut counters = counters.lock().unwrap();
                let now = Instant::now();
                let entry = counters.entry(key.to_string()).or_insert((0, now));
                if now.duration_since(entry.1) >= window {
                    *entry = (0, now);
                }
                entry.0 += 1;
                Ok(entry.0)
            }
        }
    }

    /// Checks and consumes one unit of the global per-IP budget.
    pub async fn check_global(&self, ip: &str) -> anyhow::Result<bool> {
        let key = format!("ratelimit:global:{}", ip);
        let count = self.incr(&key, GLOBAL_WINDOW_SECS).await?;
        Ok(count <= GLOBAL_LIMIT)
    }

    /// Checks and consumes one unit of the per-tenant ingress budget.
    pub async fn check_tenant(&self, tenant_id: &uuid::Uuid) -> anyhow::Result<bool> {
        let key = format!("ratelimit:tenant:{}", tenant_id);
        let count = self.incr(&key, TENANT_WINDOW_SECS).await?;
        Ok(count <= TENANT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_limiter_enforces_budget_within_window() {
        let limiter = RateLimiter::in_memory();
        for _ in 0..GLOBAL_LIMIT {
            assert!(limiter.check_global("1.2.3.4").await.unwrap());
        }
        assert!(!limiter.check_global("1.2.3.4").await.unwrap());
    }

    #[tokio::test]
    async fn in_memory_limiter_tracks_keys_independently() {
        let limiter = RateLimiter::in_memory();
        for _ in 0..GLOBAL_LIMIT {
            assert!(limiter.check_global("1.2.3.4").await.unwrap());
        }
        assert!(!limiter.check_global("1.2.3.4").await.unwrap());
        assert!(limiter.check_global("5.6.7.8").await.unwrap());
    }
}
