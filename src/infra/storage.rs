use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use std::time::Duration;

use crate::config::AppConfig;

/// Result of a backend write: the public URL plus the object key when the
/// backend addresses objects by key (inline storage does not).
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub url: String,
    pub key: Option<String>,
}

/// Where image bytes live. The upload path derives a key and hands the bytes
/// over; everything else in the system only ever sees the returned URL.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key`, returning a publicly fetchable URL.
    async fn store(&self, data: Bytes, content_type: &str, key: &str) -> Result<StoredObject>;

    /// Derive a resized preview variant by appending URL transformation
    /// parameters, for backends fronted by an image CDN. Backends without the
    /// capability return `None` and callers fall back to the base URL.
    fn preview_variant(&self, _image_url: &str, _width: u32, _height: u32) -> Option<String> {
        None
    }
}

/// S3-compatible object storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint: String,
    public_endpoint: Option<String>,
    transform_query: Option<String>,
    timeout: Duration,
}

impl S3Storage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let endpoint = config
            .s3_endpoint
            .clone()
            .ok_or_else(|| anyhow!("S3_ENDPOINT is not set"))?;
        let bucket = config
            .s3_bucket
            .clone()
            .ok_or_else(|| anyhow!("S3_BUCKET is not set"))?;

        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(endpoint.clone());
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let client = Client::from_conf(s3_builder.build());

        Ok(Self {
            client,
            bucket,
            endpoint,
            public_endpoint: config.s3_public_endpoint.clone(),
            transform_query: config.s3_transform_query.clone(),
            timeout: Duration::from_secs(config.storage_timeout_seconds),
        })
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_endpoint {
            Some(public) => format!("{}/{}", public.trim_end_matches('/'), key),
            None => format!(
                "{}/{}/{}",
                self.endpoint.trim_end_matches('/'),
                self.bucket,
                key
            ),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn store(&self, data: Bytes, content_type: &str, key: &str) -> Result<StoredObject> {
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send();

        tokio::time::timeout(self.timeout, put)
            .await
            .map_err(|_| anyhow!("object storage write timed out after {:?}", self.timeout))?
            .map_err(|err| anyhow!("object storage write failed: {}", err))?;

        Ok(StoredObject {
            url: self.public_url(key),
            key: Some(key.to_string()),
        })
    }

    fn preview_variant(&self, image_url: &str, width: u32, height: u32) -> Option<String> {
        let template = self.transform_query.as_deref()?;
        let query = template
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string());
        let separator = if image_url.contains('?') { '&' } else { '?' };
        Some(format!("{}{}{}", image_url, separator, query))
    }
}

/// Inline storage: the "URL" is a base64 data URL carrying the bytes
/// themselves, so the record store is the only durable dependency.
#[derive(Clone, Default)]
pub struct InlineStorage;

impl InlineStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for InlineStorage {
    async fn store(&self, data: Bytes, content_type: &str, _key: &str) -> Result<StoredObject> {
        Ok(StoredObject {
            url: format!("data:{};base64,{}", content_type, STANDARD.encode(&data)),
            key: None,
        })
    }
}
