use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One uploaded image. Created exactly once per successful upload and never
/// updated or deleted afterwards.
///
/// `short_url` is deliberately not part of the record: it is recomputed from
/// the deployment base URL at read time so that links survive a domain move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    /// 8-character random URL-safe token; the public lookup key, unique.
    pub short_id: String,
    /// Original client-supplied file name, display-only.
    pub file_name: String,
    /// Backend-specific object key; absent for inline (data URL) storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    /// Fully dereferenceable URL (or data URL) for the image bytes.
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ImageRecord {
    pub fn short_url(&self, base_url: &str) -> String {
        format!("{}/img/{}", base_url.trim_end_matches('/'), self.short_id)
    }
}
