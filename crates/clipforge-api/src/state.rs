//! Application state.

use std::sync::Arc;

use clipforge_db::Database;
use clipforge_queue::{JobQueue, ProgressStore};
use clipforge_storage::ObjectStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: Database,
    pub storage: Arc<ObjectStore>,
    pub queue: Arc<JobQueue>,
    pub progress: Arc<ProgressStore>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::from_env().await?;
        db.migrate().await?;

        let storage = ObjectStore::from_env()?;
        let queue = JobQueue::from_env()?;
        queue.init().await?;
        let progress = ProgressStore::from_env()?;

        Ok(Self {
            config,
            db,
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            progress: Arc::new(progress),
        })
    }
}
