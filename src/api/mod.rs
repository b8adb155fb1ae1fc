//! Management surface — tenant signup, bearer API-key verification, target
//! upsert, whoami, and the signing-secret endpoint.
//!
//! These endpoints sit alongside the core ingress/delivery pipeline but are
//! fully implemented here, not stubbed: a runnable relay needs somewhere for
//! a tenant to come from before `/in/{token}` means anything.

pub mod handlers;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;

use crate::errors::AppError;
use crate::models::Tenant;
use crate::state::AppState;

/// Bearer-auth extractor: resolves the caller's tenant from an
/// `Authorization: Bearer <api_key>` header. Handlers that need an
/// authenticated tenant take `AuthContext` as an argument; axum runs the
/// extraction before the handler body, so an invalid/missing key never
/// reaches handler logic as anything other than a rejected request.
pub struct AuthContext {
    pub tenant: Tenant,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AppError::Unauthorized)?;

        let hash = crate::models::api_key::hash_key(raw, &state.config.api_key_salt);

        let tenant = state
            .db
            .get_tenant_by_api_key_hash(&hash)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthContext { tenant })
    }
}

/// Builds the management-surface routes. Mounted directly at top-level
/// paths (`/signup`, `/me`, `/targets`, `/tenants/{token}/stripe`) rather
/// than nested under an API prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/me", get(handlers::whoami))
        .route("/targets", post(handlers::upsert_target))
        .route(
            "/tenants/:token/stripe",
            put(handlers::set_signing_secret),
        )
}

pub async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> StatusCode {
    if sqlx::query("SELECT 1").execute(state.db.pool()).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    let mut redis = state.redis.clone();
    let pong: Result<String, _> = redis::cmd("PING").query_async(&mut redis).await;
    if pong.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
