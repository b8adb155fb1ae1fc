//! Handlers for the management surface: signup, whoami, target
//! upsert, and the signing-secret endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::AuthContext;
use crate::errors::AppError;
use crate::models::{api_key, Tenant};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub token: String,
}

impl From<&Tenant> for TenantSummary {
    fn from(t: &Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            token: t.token.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub tenant: TenantSummary,
    pub api_key: String,
    pub ingress_url: String,
}

/// `POST /signup` — no auth. Creates a Tenant with a random public ingress
/// token and issues the one ApiKey a caller will ever see in plaintext.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = Tenant::new_token();
    let tenant = state.db.create_tenant(&req.name, &token).await?;

    let raw_key = api_key::new_raw_key();
    let key_hash = api_key::hash_key(&raw_key, &state.config.api_key_salt);
    state.db.create_api_key(tenant.id, &key_hash).await?;

    let ingress_url = format!("/in/{}", tenant.token);

    Ok(Json(SignupResponse {
        tenant: TenantSummary::from(&tenant),
        api_key: raw_key,
        ingress_url,
    }))
}

/// `GET /me` — bearer-authenticated whoami.
pub async fn whoami(auth: AuthContext) -> impl IntoResponse {
    Json(TenantSummary::from(&auth.tenant))
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub url: String,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TargetResponse {
    pub id: Uuid,
    pub url: String,
    pub provider: String,
    pub headers: Option<Value>,
}

/// `POST /targets` — bearer-authenticated upsert of the caller's single
/// delivery destination.
pub async fn upsert_target(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<TargetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = req.provider.as_deref().unwrap_or("stripe");
    let target = state
        .db
        .upsert_target(auth.tenant.id, &req.url, req.headers.as_ref(), provider)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TargetResponse {
            id: target.id,
            url: target.url,
            provider: target.provider,
            headers: target.headers,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SetSigningSecretRequest {
    pub signing_secret: String,
}

/// `PUT /tenants/{token}/stripe` — sets/rotates the caller's HMAC signing
/// secret. Gated behind bearer auth and additionally requires the path
/// token to match the caller's own tenant token, so one tenant can never
/// rotate another's secret even with a valid key of their own.
pub async fn set_signing_secret(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(token): Path<String>,
    Json(req): Json<SetSigningSecretRequest>,
) -> Result<impl IntoResponse, AppError> {
    if token != auth.tenant.token {
        return Err(AppError::Forbidden);
    }

    state
        .db
        .set_signing_secret(auth.tenant.id, &req.signing_secret)
        .await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
