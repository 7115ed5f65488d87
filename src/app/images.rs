use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::image::ImageRecord;
use crate::infra::storage::StorageBackend;

pub const SHORT_ID_LEN: usize = 8;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

const MIB: f64 = 1024.0 * 1024.0;

/// Persistent image record store. One durable table keyed by `short_id`;
/// records are insert-once, read-many — no update or delete exists.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn insert(&self, record: &ImageRecord) -> Result<(), InsertError>;
    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ImageRecord>>;
    async fn list_newest_first(&self) -> Result<Vec<ImageRecord>>;
    async fn ping(&self) -> Result<()>;
}

/// Insert failure, with short-id collisions split out so a race between two
/// uploads minting the same token fails loudly instead of overwriting.
#[derive(Debug)]
pub enum InsertError {
    DuplicateShortId,
    Store(anyhow::Error),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateShortId => write!(f, "short id already exists"),
            InsertError::Store(err) => write!(f, "record store failure: {}", err),
        }
    }
}

impl std::error::Error for InsertError {}

#[derive(Debug)]
pub enum UploadError {
    Validation(String),
    /// Unique-index violation on insert; retryable by the client.
    ShortIdCollision,
    Storage(anyhow::Error),
    Store(anyhow::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Validation(msg) => write!(f, "{}", msg),
            UploadError::ShortIdCollision => write!(f, "short id collision"),
            UploadError::Storage(err) => write!(f, "storage backend failure: {}", err),
            UploadError::Store(err) => write!(f, "record store failure: {}", err),
        }
    }
}

impl std::error::Error for UploadError {}

#[derive(Debug)]
pub struct UploadReceipt {
    pub short_id: String,
    pub short_url: String,
    pub image_url: String,
    pub file_name: String,
    pub file_size: usize,
}

#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn ImageStore>,
    storage: Arc<dyn StorageBackend>,
    base_url: String,
    upload_max_bytes: usize,
}

impl ImageService {
    pub fn new(
        store: Arc<dyn ImageStore>,
        storage: Arc<dyn StorageBackend>,
        base_url: String,
        upload_max_bytes: usize,
    ) -> Self {
        Self {
            store,
            storage,
            base_url,
            upload_max_bytes,
        }
    }

    /// Validate, store the bytes, persist the record, return the short link.
    ///
    /// A storage write that succeeds before a failing insert leaves an
    /// orphaned object behind; there is no compensating cleanup.
    pub async fn upload(
        &self,
        file_name: String,
        content_type: String,
        data: Bytes,
    ) -> Result<UploadReceipt, UploadError> {
        validate_upload(&file_name, &content_type, data.len(), self.upload_max_bytes)
            .map_err(UploadError::Validation)?;

        let short_id = mint_short_id();
        let key = object_key(&short_id, &file_name);
        let file_size = data.len();

        let stored = self
            .storage
            .store(data, &content_type, &key)
            .await
            .map_err(UploadError::Storage)?;

        let record = ImageRecord {
            id: Uuid::new_v4(),
            short_id: short_id.clone(),
            file_name,
            file_key: stored.key,
            image_url: stored.url,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(InsertError::DuplicateShortId) => return Err(UploadError::ShortIdCollision),
            Err(InsertError::Store(err)) => return Err(UploadError::Store(err)),
        }

        Ok(UploadReceipt {
            short_url: record.short_url(&self.base_url),
            short_id,
            image_url: record.image_url,
            file_name: record.file_name,
            file_size,
        })
    }

    /// Point lookup by short id. `Ok(None)` is legitimate absence; `Err` is
    /// an infrastructure fault and callers log the two differently.
    pub async fn resolve(&self, short_id: &str) -> Result<Option<ImageRecord>> {
        self.store.find_by_short_id(short_id).await
    }

    pub async fn list(&self) -> Result<Vec<ImageRecord>> {
        self.store.list_newest_first().await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Upload validation. MIME type is the authoritative check; the extension
/// check is a secondary heuristic and the two can disagree on odd inputs.
pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<(), String> {
    if size > max_bytes {
        return Err(format!(
            "File too large. Maximum size is {}MB, got {:.2}MB",
            max_bytes as f64 / MIB,
            size as f64 / MIB
        ));
    }

    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(format!(
            "Unsupported file type '{}'. Accepted types: {}",
            content_type,
            ALLOWED_CONTENT_TYPES.join(", ")
        ));
    }

    let ext = file_extension(file_name).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "Unsupported file extension '{}'. Accepted extensions: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        ));
    }

    Ok(())
}

/// Random 8-character alphanumeric token; uniqueness is enforced by the
/// store's unique index, not by this generator.
pub fn mint_short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

fn object_key(short_id: &str, file_name: &str) -> String {
    let now_ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    match file_extension(file_name) {
        Some(ext) => format!("images/{}-{}.{}", short_id, now_ms, ext),
        None => format!("images/{}-{}", short_id, now_ms),
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MIB: usize = 5 * 1024 * 1024;

    #[test]
    fn accepts_small_png() {
        assert!(validate_upload("cat.png", "image/png", 1024, FIVE_MIB).is_ok());
    }

    #[test]
    fn rejects_oversized_file_naming_both_sizes() {
        let err = validate_upload("big.jpg", "image/jpeg", 10 * 1024 * 1024, FIVE_MIB)
            .unwrap_err();
        assert!(err.contains("5MB"), "missing limit in: {}", err);
        assert!(err.contains("10.00MB"), "missing actual size in: {}", err);
    }

    #[test]
    fn rejects_disallowed_content_type_naming_accepted_set() {
        let err = validate_upload("page.png", "text/html", 10, FIVE_MIB).unwrap_err();
        assert!(err.contains("text/html"));
        assert!(err.contains("image/jpeg"));
        assert!(err.contains("image/gif"));
    }

    #[test]
    fn rejects_disallowed_extension_even_with_valid_mime() {
        let err = validate_upload("shot.bmp", "image/png", 10, FIVE_MIB).unwrap_err();
        assert!(err.contains("bmp"));
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(validate_upload("noext", "image/png", 10, FIVE_MIB).is_err());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_upload("CAT.PNG", "image/png", 10, FIVE_MIB).is_ok());
    }

    #[test]
    fn short_ids_are_eight_url_safe_chars() {
        for _ in 0..64 {
            let id = mint_short_id();
            assert_eq!(id.len(), SHORT_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn object_key_embeds_short_id_and_extension() {
        let key = object_key("abcd1234", "cat.PNG");
        assert!(key.starts_with("images/abcd1234-"));
        assert!(key.ends_with(".png"));
    }
}
