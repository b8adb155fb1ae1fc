//! Blob store — durable secondary copy of every admitted event body.
//! Every admitted event is written twice: a row in Postgres and a
//! blob here, keyed deterministically by `<tenant_id>/<fingerprint>.json` so
//! the two copies can be cross-checked or the blob rebuilt from the row (or
//! vice versa) without a side index.
//!
//! Failure to write the blob is logged but never fails the ingress request —
//! the Postgres row is the record of truth for delivery; the blob is a
//! recovery/audit copy.

use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::{path::Path, Attribute, Attributes, ObjectStore, PutOptions, PutPayload};

pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    /// Builds a store from `EVENTS_BUCKET` / `AWS_ENDPOINT_URL` style config.
    /// An `AWS_ENDPOINT_URL` starting with `file://` builds a local
    /// filesystem store instead, for development without real S3/MinIO.
    pub fn from_config(cfg: &crate::config::Config) -> Result<Self> {
        if let Some(endpoint) = cfg.aws_endpoint_url.as_deref() {
            if let Some(path) = endpoint.strip_prefix("file://") {
                let store = object_store::local::LocalFileSystem::new_with_prefix(path)
                    .context("failed to create local file system blob store")?;
                return Ok(Self {
                    store: Arc::new(store),
                });
            }
        }

        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_bucket_name(&cfg.events_bucket)
            .with_region(&cfg.aws_region);

        if let Some(endpoint) = cfg.aws_endpoint_url.as_deref() {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        if let Ok(key) = std::env::var("AWS_ACCESS_KEY_ID") {
            if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
                builder = builder
                    .with_access_key_id(key)
                    .with_secret_access_key(secret);
            }
        }

        // Server-side encryption: SSE-KMS when a key id is configured,
        // bucket default otherwise.
        let builder = match cfg.aws_sse_kms_key_id.as_deref() {
            Some(key_id) => builder
                .with_config(object_store::aws::AmazonS3ConfigKey::ServerSideEncryption, "aws:kms")
                .with_config(object_store::aws::AmazonS3ConfigKey::SseKmsKeyId, key_id),
            None => builder,
        };

        let store = builder.build().context("failed to build S3 blob store")?;
        Ok(Self {
            store: Arc::new(store),
        })
    }

    /// Writes `body` under `key` with `Content-Type: application/json`.
    /// Callers treat failure as non-fatal and log it — see module docs.
    pub async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = Path::from(key);
        let attrs = Attributes::from_iter([(Attribute::ContentType, "application/json".into())]);
        self.store
            .put_opts(
                &path,
                PutPayload::from(body),
                PutOptions {
                    attributes: attrs,
                    ..Default::default()
                },
            )
            .await
            .context("failed to write blob")?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = Path::from(key);
        let bytes = self
            .store
            .get(&path)
            .await
            .context("failed to read blob")?
            .bytes()
            .await
            .context("failed to collect blob bytes")?;
        Ok(bytes.to_vec())
    }

    /// Confirms the configured bucket is reachable and writable before the
    /// server starts serving traffic.
    ///
    /// `object_store` is a data-plane client — it has no API for bucket
    /// creation or control-plane settings (block-public-access,
    /// default-encryption policy). Those remain a one-time, out-of-band
    /// account setup step; this routine writes and removes a marker object
    /// so a misconfigured bucket/region or missing credentials fail loudly
    /// at startup instead of silently on the first real event.
    pub async fn bootstrap(&self) -> Result<()> {
        let marker = Path::from(".bootstrap");
        self.store
            .put(&marker, Vec::new().into())
            .await
            .context("bucket bootstrap: failed to write marker object")?;
        self.store
            .delete(&marker)
            .await
            .context("bucket bootstrap: failed to clean up marker object")?;
        Ok(())
    }
}
