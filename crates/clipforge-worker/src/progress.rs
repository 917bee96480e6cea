//! Milestone reporting and cooperative cancellation checks.
//!
//! A milestone is the only place a worker observes cancellation: the
//! status row is read, and a cancelled (or otherwise foreign) status
//! stops the pipeline before any further writes.

use clipforge_db::Database;
use clipforge_models::{JobId, JobStatus, RenderId};
use clipforge_queue::{ProgressStore, StatusSnapshot};
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Milestone reporter for analyzer jobs.
pub struct JobProgress<'a> {
    db: &'a Database,
    store: &'a ProgressStore,
    job_id: JobId,
}

impl<'a> JobProgress<'a> {
    pub fn new(db: &'a Database, store: &'a ProgressStore, job_id: JobId) -> Self {
        Self { db, store, job_id }
    }

    /// Record a milestone: check for cancellation, then persist
    /// progress and the step tag before the next sub-step begins.
    pub async fn milestone(&self, step: &str, progress: i32) -> WorkerResult<()> {
        match self.db.jobs().status(self.job_id).await? {
            Some(JobStatus::Processing) => {}
            Some(JobStatus::Cancelled) => return Err(WorkerError::Cancelled),
            Some(other) => {
                return Err(WorkerError::job_failed(format!(
                    "job left processing state externally: {other}"
                )))
            }
            None => return Err(WorkerError::job_failed("job row disappeared")),
        }

        info!(job_id = %self.job_id, step = step, progress, "Milestone");
        self.db.jobs().update_progress(self.job_id, progress, step).await?;

        let snapshot = StatusSnapshot::new(self.job_id.to_string(), JobStatus::Processing, progress)
            .with_step(step);
        self.store.publish(&snapshot).await.ok();
        self.store.heartbeat(&self.job_id.to_string()).await.ok();

        Ok(())
    }
}

/// Per-pair progress reporter for render jobs.
pub struct RenderProgress<'a> {
    db: &'a Database,
    store: &'a ProgressStore,
    render_id: RenderId,
}

impl<'a> RenderProgress<'a> {
    pub fn new(db: &'a Database, store: &'a ProgressStore, render_id: RenderId) -> Self {
        Self {
            db,
            store,
            render_id,
        }
    }

    /// Cancellation check at a pair boundary.
    pub async fn check_cancelled(&self) -> WorkerResult<()> {
        match self.db.renders().status(self.render_id).await? {
            Some(JobStatus::Processing) => Ok(()),
            Some(JobStatus::Cancelled) => Err(WorkerError::Cancelled),
            Some(other) => Err(WorkerError::job_failed(format!(
                "render left processing state externally: {other}"
            ))),
            None => Err(WorkerError::job_failed("render row disappeared")),
        }
    }

    /// Record one completed pair.
    pub async fn record_pair(
        &self,
        files: &clipforge_models::RenderFiles,
        completed: usize,
        total: usize,
    ) -> WorkerResult<()> {
        let progress = ((100 * completed) / total.max(1)) as i32;
        info!(render_id = %self.render_id, completed, total, progress, "Pair complete");
        self.db
            .renders()
            .record_pair(self.render_id, files, progress)
            .await?;

        let snapshot =
            StatusSnapshot::new(self.render_id.to_string(), JobStatus::Processing, progress);
        self.store.publish(&snapshot).await.ok();
        self.store.heartbeat(&self.render_id.to_string()).await.ok();

        Ok(())
    }
}
