//! Shared worker context.

use std::sync::Arc;

use clipforge_db::Database;
use clipforge_queue::{JobQueue, ProgressStore};
use clipforge_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Everything a pipeline run needs, cloned per job task.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub db: Database,
    pub storage: ObjectStore,
    pub queue: Arc<JobQueue>,
    pub progress: ProgressStore,
}

impl WorkerContext {
    /// Build the context from the environment.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let db = Database::from_env().await?;
        let storage = ObjectStore::from_env()?;
        let queue = Arc::new(JobQueue::from_env()?);
        let progress = ProgressStore::from_env()?;

        Ok(Self {
            config,
            db,
            storage,
            queue,
            progress,
        })
    }
}
