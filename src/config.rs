use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub aws_region: String,
    pub events_bucket: String,
    pub aws_endpoint_url: Option<String>,
    pub aws_sse_kms_key_id: Option<String>,
    pub allowed_origins: Vec<String>,
    pub frontend_url: Option<String>,
    pub api_key_salt: String,
    /// Tolerance, in seconds, for the `t=` timestamp in a signature header.
    pub signature_tolerance_secs: i64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let api_key_salt = std::env::var("API_KEY_SALT").unwrap_or_else(|_| {
        eprintln!(
            "⚠️  API_KEY_SALT is not set — using an insecure development default. \
             Set a random value for production."
        );
        "insecure-dev-salt".to_string()
    });

    Ok(Config {
        port: std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/webhook_relay".into()),
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        aws_region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into()),
        events_bucket: std::env::var("EVENTS_BUCKET").unwrap_or_else(|_| "events".into()),
        aws_endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
        aws_sse_kms_key_id: std::env::var("AWS_SSE_KMS_KEY_ID").ok(),
        allowed_origins: std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        frontend_url: std::env::var("FRONTEND_URL").ok(),
        api_key_salt,
        signature_tolerance_secs: std::env::var("SIGNATURE_TOLERANCE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::signature::DEFAULT_TOLERANCE_SECS),
    })
}
