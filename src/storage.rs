//! Feedback persistence.
//!
//! Records are append-only: a store can insert one record and return all of
//! them, nothing else. Which backend is used comes from `storage.backend`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::csv_store::CsvStore;
use crate::database::{MySqlStore, SqliteStore};
use crate::error::Result;
use crate::feedback::{FeedbackRecord, NewFeedback};

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persists one submission and returns it with its assigned identity.
    async fn insert(&self, feedback: NewFeedback) -> Result<FeedbackRecord>;

    /// Every stored record, in the backend's natural order.
    async fn fetch_all(&self) -> Result<Vec<FeedbackRecord>>;
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn FeedbackStore>> {
    let store: Arc<dyn FeedbackStore> = match config.storage.backend {
        StorageBackend::Csv => {
            info!("Using flat-file storage at {}", config.storage.csv_path.display());
            Arc::new(CsvStore::new(&config.storage.csv_path))
        }
        StorageBackend::Sqlite => {
            info!("Using SQLite storage at {}", config.storage.sqlite_url);
            Arc::new(SqliteStore::connect(&config.storage.sqlite_url).await?)
        }
        StorageBackend::Mysql => {
            info!(
                "Using MySQL storage at {}:{}/{}",
                config.database.host, config.database.port, config.database.name
            );
            Arc::new(MySqlStore::connect(&config.database).await?)
        }
    };

    Ok(store)
}
