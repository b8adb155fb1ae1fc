//! Delivery job queue — a Redis sorted set scored by
//! due-at time, rather than a plain list, so an attempt can be scheduled for
//! the future (`enqueue_at`) and the worker only ever claims jobs whose time
//! has come.
//!
//! At-least-once, crash-safe: `claim_ready` does not remove a job from the
//! set — it re-scores it to `now + lease_ms` so no other poller claims it
//! while it's in flight, via a Lua script so the read-then-rescore is one
//! atomic Redis operation. The job is only actually removed by `complete`,
//! which the worker calls after the attempt's outcome (and, on retry, the
//! next attempt's `enqueue_at`) has committed to Postgres. A crash anywhere
//! between claim and `complete` leaves the job sitting at its leased score;
//! once that score elapses it falls back into the claimable range and a
//! later poll picks it up again — the job is never dropped, only possibly
//! reprocessed, which the worker must already tolerate (delivery jobs are
//! at-least-once).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "delivery:jobs";

/// How long a claimed job is protected from re-claim while a worker
/// processes it. Generously larger than the 10s outbound POST timeout plus
/// the DB writes that follow it, so a live worker always calls `complete`
/// well before the lease would expire; a crashed worker's claim expires and
/// the job becomes claimable again.
pub const CLAIM_LEASE_MILLIS: i64 = 120_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub event_id: Uuid,
    /// The attempt number this job represents (1-based). Carried on the job
    /// itself rather than recomputed from delivery row counts, so a crash
    /// and requeue can't silently compound the backoff.
    pub attempt: u32,
}

#[derive(Clone)]
pub struct JobQueue {
    redis: ConnectionManager,
}

impl JobQueue {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Schedules `job` to become claimable at `due_at_millis` (Unix epoch
    /// milliseconds).
    pub async fn enqueue_at(&self, job: &DeliveryJob, due_at_millis: i64) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(job)?;
        conn.zadd::<_, _, _, ()>(QUEUE_KEY, payload, due_at_millis)
            .await?;
        Ok(())
    }

    /// Claims up to `limit` jobs whose score (due-at) is `<= now_millis`,
    /// leasing each one by re-scoring it to `now_millis + CLAIM_LEASE_MILLIS`
    /// rather than removing it. The read-and-rescore happens inside a single
    /// Lua script, so it is atomic with respect to any other caller running
    /// the same script against this Redis instance — two pollers can never
    /// both walk away with the same job.
    pub async fn claim_ready(&self, now_millis: i64, limit: isize) -> anyhow::Result<Vec<DeliveryJob>> {
        let mut conn = self.redis.clone();
        let script = redis::Script::new(
            r#"
            local key = KEYS[1]
            local now = tonumber(ARGV[1])
            local limit = tonumber(ARGV[2])
            local lease_until = tonumber(ARGV[3])
            local ready = redis.call("ZRANGEBYSCORE", key, "-inf", now, "LIMIT", 0, limit)
            for _, member in ipairs(ready) do
                redis.call("ZADD", key, lease_until, member)
            end
            return ready
            "#,
        );

        let payloads: Vec<String> = script
            .key(QUEUE_KEY)
            .arg(now_millis)
            .arg(limit)
            .arg(now_millis + CLAIM_LEASE_MILLIS)
            .invoke_async(&mut conn)
            .await?;

        Ok(payloads
            .into_iter()
            .filter_map(|payload| serde_json::from_str::<DeliveryJob>(&payload).ok())
            .collect())
    }

    /// Removes `job` from the queue outright. Call this only once its
    /// outcome (Delivery row, and on retry the next attempt's `enqueue_at`)
    /// has durably committed — see module docs.
    pub async fn complete(&self, job: &DeliveryJob) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(job)?;
        conn.zrem::<_, _, ()>(QUEUE_KEY, payload).await?;
        Ok(())
    }
}
