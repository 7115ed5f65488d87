use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::app::images::{ImageStore, InsertError};
use crate::domain::image::ImageRecord;

/// In-process image record store for local development and tests. Enforces
/// the same short-id uniqueness contract as the Postgres store.
#[derive(Clone, Default)]
pub struct MemoryImageStore {
    records: Arc<RwLock<Vec<ImageRecord>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn insert(&self, record: &ImageRecord) -> Result<(), InsertError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.short_id == record.short_id) {
            return Err(InsertError::DuplicateShortId);
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ImageRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.short_id == short_id).cloned())
    }

    async fn list_newest_first(&self) -> Result<Vec<ImageRecord>> {
        let records = self.records.read().await;
        // Reverse insertion order first so equal timestamps still come back
        // newest-insert-first after the stable sort.
        let mut sorted: Vec<ImageRecord> = records.iter().rev().cloned().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sorted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
