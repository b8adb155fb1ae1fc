//! Assembles the full HTTP router from an already-built [`AppState`].
//!
//! Factored out of `main.rs` so integration tests can build the exact same
//! router against a test database/Redis instance without duplicating the
//! route table.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{api, ingress, replay};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(api::readiness_check))
        .route("/in/:token", post(ingress::ingest))
        .route("/events/:event_id/replay", post(replay::replay))
        .merge(api::router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
