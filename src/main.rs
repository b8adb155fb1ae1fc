use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod cli;
mod config;
mod errors;
mod fingerprint;
mod ingress;
mod models;
mod queue;
mod ratelimit;
mod replay;
mod signature;
mod state;
mod store;
mod util;
mod worker;

use queue::JobQueue;
use ratelimit::RateLimiter;
use state::AppState;
use store::{BlobStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "webhook_relay=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Migrate) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Some(cli::Commands::BootstrapBucket) => {
            let blobs = BlobStore::from_config(&cfg)?;
            blobs.bootstrap().await?;
            tracing::info!(bucket = %cfg.events_bucket, "blob bucket reachable and writable");
            Ok(())
        }
        Some(cli::Commands::Seed {
            name,
            target_url,
            signing_secret,
        }) => seed(cfg, name, target_url, signing_secret).await,
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port_override: Option<u16>) -> anyhow::Result<()> {
    tracing::info!("connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("running migrations...");
    db.migrate().await?;

    tracing::info!("connecting to redis...");
    let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;

    tracing::info!("initializing blob store...");
    let blobs = BlobStore::from_config(&cfg).context("failed to build blob store")?;

    let queue = JobQueue::new(redis_conn.clone());

    tracing::info!("connecting rate limiter to redis...");
    let limiter = RateLimiter::connect(cfg.redis_url.as_str()).await;
    let port = port_override.unwrap_or(cfg.port);
    let allowed_origins = cfg.allowed_origins.clone();

    let state = AppState {
        db,
        blobs: std::sync::Arc::new(blobs),
        queue,
        limiter,
        redis: redis_conn,
        config: std::sync::Arc::new(cfg),
    };

    worker::spawn(state.clone());
    tracing::info!("delivery worker started");

    let app = app::router(state).layer(cors_layer(&allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("webhook-relay listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    use tower_http::cors::AllowOrigin;

    if allowed_origins.is_empty() {
        return CorsLayer::new();
    }

    let origins = allowed_origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|o| origins.iter().any(|allowed| allowed == o))
                .unwrap_or(false)
        }))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("stripe-signature"),
        ])
}

/// `webhook-relay seed` — local-development convenience: creates a tenant,
/// issues an API key, and upserts a target in one shot.
async fn seed(
    cfg: config::Config,
    name: String,
    target_url: String,
    signing_secret: Option<String>,
) -> anyhow::Result<()> {
    let db = PgStore::connect(&cfg.database_url).await?;

    let token = models::Tenant::new_token();
    let tenant = db.create_tenant(&name, &token).await?;

    let raw_key = models::api_key::new_raw_key();
    let key_hash = models::api_key::hash_key(&raw_key, &cfg.api_key_salt);
    db.create_api_key(tenant.id, &key_hash).await?;

    db.upsert_target(tenant.id, &target_url, None, "stripe")
        .await?;

    if let Some(secret) = signing_secret {
        db.set_signing_secret(tenant.id, &secret).await?;
    }

    println!("Tenant created:");
    println!("  id:          {}", tenant.id);
    println!("  name:        {}", tenant.name);
    println!("  token:       {}", tenant.token);
    println!("  ingress_url: /in/{}", tenant.token);
    println!("  api_key:     {}", raw_key);

    Ok(())
}
