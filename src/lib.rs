pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::crawler::CrawlerDetector;
use crate::app::images::ImageStore;
use crate::infra::storage::StorageBackend;

/// Process-wide dependencies, constructed once at startup and injected into
/// handlers. Which store/backend implementation sits behind each trait is
/// decided by configuration, never inside request handling.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub storage: Arc<dyn StorageBackend>,
    pub crawlers: CrawlerDetector,
    pub base_url: String,
    pub upload_max_bytes: usize,
}
