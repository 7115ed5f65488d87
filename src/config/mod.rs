use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

/// Which implementation backs the persistent image record store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

/// Which implementation holds the image bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Encode bytes as a `data:` URL inside the record itself.
    Inline,
    /// S3-compatible object store.
    S3,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub base_url: String,
    pub store_kind: StoreKind,
    pub storage_kind: StorageKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_bucket: Option<String>,
    pub s3_public_endpoint: Option<String>,
    /// Optional query template (`{w}`/`{h}` placeholders) appended to public
    /// URLs to derive resized preview variants, for CDN-backed buckets.
    pub s3_transform_query: Option<String>,
    pub storage_timeout_seconds: u64,
    pub upload_max_bytes: usize,
    /// Extra crawler user-agent signatures, merged with the built-in set.
    pub crawler_signatures: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        SocketAddr::from_str(&http_addr).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_kind = match env_or("RECORD_STORE", "postgres").as_str() {
            "postgres" => StoreKind::Postgres,
            "memory" => StoreKind::Memory,
            other => return Err(anyhow!("unknown RECORD_STORE: {}", other)),
        };
        let storage_kind = match env_or("STORAGE_BACKEND", "inline").as_str() {
            "inline" => StorageKind::Inline,
            "s3" => StorageKind::S3,
            other => return Err(anyhow!("unknown STORAGE_BACKEND: {}", other)),
        };

        let base_url = resolve_base_url()?;

        let crawler_signatures = match std::env::var("CRAWLER_SIGNATURES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => Vec::new(),
        };

        let config = Self {
            http_addr,
            base_url,
            store_kind,
            storage_kind,
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            s3_endpoint: std::env::var("S3_ENDPOINT").ok(),
            s3_region: env_or("S3_REGION", "us-east-1"),
            s3_bucket: std::env::var("S3_BUCKET").ok(),
            s3_public_endpoint: std::env::var("S3_PUBLIC_ENDPOINT").ok(),
            s3_transform_query: std::env::var("S3_TRANSFORM_QUERY").ok(),
            storage_timeout_seconds: env_or_parse("STORAGE_TIMEOUT_SECONDS", "30")?,
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "5242880")?,
            crawler_signatures,
        };

        if config.store_kind == StoreKind::Postgres && config.database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }
        if config.storage_kind == StorageKind::S3 {
            if config.s3_endpoint.is_none() {
                return Err(anyhow!("missing required env var: S3_ENDPOINT"));
            }
            if config.s3_bucket.is_none() {
                return Err(anyhow!("missing required env var: S3_BUCKET"));
            }
        }

        Ok(config)
    }
}

/// Resolve the canonical public base URL used for short links and Open Graph
/// tags: explicit PUBLIC_BASE_URL wins, then the platform-provided HOST, then
/// a local-development fallback.
fn resolve_base_url() -> Result<String> {
    let raw = if let Ok(explicit) = std::env::var("PUBLIC_BASE_URL") {
        explicit
    } else if let Ok(host) = std::env::var("HOST") {
        format!("https://{}", host)
    } else {
        "http://localhost:8080".to_string()
    };

    let parsed = Url::parse(&raw).map_err(|err| anyhow!("invalid PUBLIC_BASE_URL: {}", err))?;
    if parsed.host_str().is_none() {
        return Err(anyhow!("invalid PUBLIC_BASE_URL: missing host"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
