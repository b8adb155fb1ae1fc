//! Shared application state, cloned cheaply into every handler via axum's
//! `State` extractor — each field is itself an `Arc`/connection-pool handle,
//! so cloning `AppState` never duplicates the underlying connections.

use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::config::Config;
use crate::queue::JobQueue;
use crate::ratelimit::RateLimiter;
use crate::store::{BlobStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub db: PgStore,
    pub blobs: Arc<BlobStore>,
    pub queue: JobQueue,
    pub limiter: RateLimiter,
    pub redis: ConnectionManager,
    pub config: Arc<Config>,
}
