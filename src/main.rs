use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imglet::app::crawler::CrawlerDetector;
use imglet::app::images::ImageStore;
use imglet::config::{AppConfig, StorageKind, StoreKind};
use imglet::http;
use imglet::infra::db::{Db, PgImageStore};
use imglet::infra::memory::MemoryImageStore;
use imglet::infra::storage::{InlineStorage, S3Storage, StorageBackend};
use imglet::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn ImageStore> = match config.store_kind {
        StoreKind::Postgres => {
            let db = Db::connect(&config).await?;
            Arc::new(PgImageStore::new(db))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory record store, records will not survive restart");
            Arc::new(MemoryImageStore::new())
        }
    };

    let storage: Arc<dyn StorageBackend> = match config.storage_kind {
        StorageKind::S3 => Arc::new(S3Storage::new(&config).await?),
        StorageKind::Inline => Arc::new(InlineStorage::new()),
    };

    let state = AppState {
        store,
        storage,
        crawlers: CrawlerDetector::new(&config.crawler_signatures),
        base_url: config.base_url.clone(),
        upload_max_bytes: config.upload_max_bytes,
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
