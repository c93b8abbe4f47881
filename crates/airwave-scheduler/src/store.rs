//! Schedule store contract — durable `action_id → due_time` persistence
//! with interchangeable backends.

use std::path::Path;
use std::sync::Arc;

use airwave_core::config::StorageConfig;
use airwave_core::error::{AirwaveError, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::action::{ActionId, DeferredAction};
use crate::file_store::FileStore;
use crate::pg_store::PgStore;

/// Backend-wide failure: connectivity loss, pool exhaustion, or a snapshot
/// that cannot be read at all. Per-entry problems (a malformed row) are
/// logged and skipped inside the backend and never surface here.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AirwaveError {
    fn from(e: StoreError) -> Self {
        AirwaveError::Storage(e.to_string())
    }
}

/// Durable mapping from action id to due time.
///
/// `put` must not return until the backend has acknowledged the write —
/// the caller may not treat the action as scheduled before that. `remove`
/// is idempotent: removing an absent key succeeds. All due-times are UTC.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Record or update the due time for an action.
    async fn put(&self, action: &DeferredAction) -> std::result::Result<(), StoreError>;

    /// Full, internally consistent snapshot. Unparseable entries are
    /// logged and skipped rather than aborting the load.
    async fn load_all(&self) -> std::result::Result<Vec<DeferredAction>, StoreError>;

    /// Delete an entry; a no-op if the key is absent.
    async fn remove(&self, id: &ActionId) -> std::result::Result<(), StoreError>;

    /// Release backend resources. Called once during shutdown.
    async fn close(&self);
}

/// Open the backend named in the configuration. Selection happens exactly
/// once — callers hold the trait object and never branch on the backend
/// kind again.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ScheduleStore>> {
    match config.backend.as_str() {
        "file" => {
            let path = shellexpand::tilde(&config.file.path).to_string();
            tracing::info!("💾 Schedule store: file snapshot at {path}");
            Ok(Arc::new(FileStore::new(Path::new(&path))?))
        }
        "postgres" => {
            tracing::info!("💾 Schedule store: postgres (pool of {})", config.postgres.max_connections);
            let store = PgStore::connect(&config.postgres.url, config.postgres.max_connections).await?;
            Ok(Arc::new(store))
        }
        other => Err(AirwaveError::Config(format!(
            "unknown storage backend {other:?}"
        ))),
    }
}
