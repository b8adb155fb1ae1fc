use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::signature::SignatureError;

/// The single error sum type at the HTTP boundary. Internal functions
/// return `Result<_, AppError>` or `anyhow::Result<_>`; this is where — and
/// only where — errors become HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown tenant")]
    UnknownTenant,

    #[error("empty body")]
    EmptyBody,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("missing signature header")]
    MissingSignature,

    #[error("tenant has no signing secret configured")]
    NoSigningSecret,

    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("invalid payload: {0:?}")]
    InvalidJson(Vec<String>),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::UnknownTenant | AppError::NotFound => {
                (StatusCode::NOT_FOUND, json!({ "detail": "Not Found" }))
            }
            AppError::EmptyBody => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Empty JSON body" }),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "detail": "Payload too large" }),
            ),
            AppError::MissingSignature => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Missing Stripe-Signature" }),
            ),
            AppError::NoSigningSecret => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Tenant has no signing secret configured" }),
            ),
            AppError::Signature(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Invalid Stripe signature" }),
            ),
            AppError::InvalidJson(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Invalid payload", "errors": errors }),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "detail": "Rate limit exceeded" }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": "Invalid or missing API key" }),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, json!({ "detail": "Forbidden" })),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error" }),
                )
            }
            AppError::Redis(e) => {
                tracing::error!(error = %e, "redis error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error" }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error" }),
                )
            }
        };

        let mut response = (status, Json(body)).into_response();

        if matches!(self, AppError::RateLimited) {
            response.headers_mut().insert(
                "retry-after",
                axum::http::HeaderValue::from_static("60"),
            );
        }

        response
    }
}
