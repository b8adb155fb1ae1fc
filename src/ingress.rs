//! Ingress handler — the `POST /in/{token}` endpoint.
//!
//! Orchestrates the whole admit path: resolve tenant, verify signature,
//! validate the minimal payload schema, dedupe-insert, best-effort blob
//! write, and enqueue the first delivery attempt. Every precondition failure
//! maps to a specific `AppError` variant so the boundary `IntoResponse`
//! keeps this function free of status-code literals.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use serde_json::json;

use crate::errors::AppError;
use crate::fingerprint::{blob_key, fingerprint};
use crate::models::event::IngressPayload;
use crate::queue::DeliveryJob;
use crate::signature;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn ingest(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if !state.limiter.check_global(&addr.ip().to_string()).await? {
        return Err(AppError::RateLimited);
    }

    if body.len() > MAX_BODY_BYTES {
        return Err(AppError::PayloadTooLarge);
    }

    let tenant = state
        .db
        .get_tenant_by_token(&token)
        .await?
        .ok_or(AppError::UnknownTenant)?;

    if !state.limiter.check_tenant(&tenant.id).await? {
        return Err(AppError::RateLimited);
    }

    if body.is_empty() {
        return Err(AppError::EmptyBody);
    }

    let sig_header = headers
        .iter()
        .find(|(name, _)| name.as_str().eq_ignore_ascii_case("stripe-signature"))
        .and_then(|(_, value)| value.to_str().ok())
        .ok_or(AppError::MissingSignature)?;

    let secret = tenant
        .signing_secret
        .as_deref()
        .ok_or(AppError::NoSigningSecret)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64;

    signature::verify(
        &body,
        sig_header,
        secret,
        now,
        Some(state.config.signature_tolerance_secs),
    )?;

    let payload: IngressPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidJson(vec![e.to_string()]))?;
    let payload_value = serde_json::to_value(&payload).map_err(anyhow::Error::from)?;

    let fp = fingerprint(&body);
    let admission = state.db.admit_event(tenant.id, &fp, &payload_value).await?;

    if admission.fresh {
        let key = blob_key(&tenant.id, &fp);
        if let Err(e) = state.blobs.put(&key, body.to_vec()).await {
            tracing::warn!(error = %e, key = %key, "blob store write failed, continuing");
        }

        let job = DeliveryJob {
            event_id: admission.event.id,
            attempt: 1,
        };
        if let Err(e) = state.queue.enqueue_at(&job, now * 1000).await {
            tracing::error!(error = %e, event_id = %admission.event.id, "failed to enqueue delivery job");
        }
    }

    Ok(Json(json!({ "status": "received" })))
}
