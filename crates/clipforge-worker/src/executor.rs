//! Job executor: consumes queue messages and drives the pipelines.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use clipforge_models::JobKind;
use clipforge_queue::{Delivery, QueueMessage};

use crate::analyzer::run_analyze;
use crate::context::WorkerContext;
use crate::deadline::spawn_soft_timeout_warning;
use crate::error::{WorkerError, WorkerResult};
use crate::renderer::run_render;

/// Consumes jobs from the queue, one permit per in-flight job.
pub struct JobExecutor {
    ctx: Arc<WorkerContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new executor over a ready context.
    pub fn new(ctx: WorkerContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Run until shutdown: one consumption loop per pipeline kind plus
    /// a periodic reclaim of messages stranded by crashed workers.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.consumer_name,
            max_jobs = self.ctx.config.max_concurrent_jobs,
            "Starting job executor"
        );

        self.ctx.queue.init().await?;

        let mut tasks = Vec::new();
        for kind in [JobKind::Analyze, JobKind::Render] {
            tasks.push(tokio::spawn(Self::consume_loop(
                Arc::clone(&self.ctx),
                Arc::clone(&self.job_semaphore),
                self.consumer_name.clone(),
                kind,
                self.shutdown.subscribe(),
            )));
        }
        tasks.push(tokio::spawn(Self::claim_loop(
            Arc::clone(&self.ctx),
            Arc::clone(&self.job_semaphore),
            self.consumer_name.clone(),
            self.shutdown.subscribe(),
        )));

        // Wait for shutdown, then drain in-flight jobs.
        let mut shutdown_rx = self.shutdown.subscribe();
        while !*shutdown_rx.borrow() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }

        info!("Waiting for in-flight jobs to finish");
        let _ = tokio::time::timeout(Duration::from_secs(60), self.wait_for_jobs()).await;
        for task in tasks {
            task.abort();
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn consume_loop(
        ctx: Arc<WorkerContext>,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        kind: JobKind,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let block_ms = ctx.config.dequeue_block.as_millis() as u64;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let available = semaphore.available_permits();
            if available == 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }

            let deliveries = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                result = ctx.queue.dequeue(kind, &consumer_name, block_ms, available) => {
                    match result {
                        Ok(deliveries) => deliveries,
                        Err(e) => {
                            error!(kind = %kind, error = %e, "Dequeue failed, backing off");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                    }
                }
            };

            for delivery in deliveries {
                Self::spawn_job(&ctx, &semaphore, delivery).await;
            }
        }
    }

    async fn claim_loop(
        ctx: Arc<WorkerContext>,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(ctx.config.claim_interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    for kind in [JobKind::Analyze, JobKind::Render] {
                        match ctx.queue.claim_stranded(kind, &consumer_name, 5).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!(kind = %kind, count = deliveries.len(), "Claimed stranded messages");
                                for delivery in deliveries {
                                    Self::spawn_job(&ctx, &semaphore, delivery).await;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!(kind = %kind, error = %e, "Failed to claim stranded messages"),
                        }
                    }
                }
            }
        }
    }

    async fn spawn_job(ctx: &Arc<WorkerContext>, semaphore: &Arc<Semaphore>, delivery: Delivery) {
        let permit = match Arc::clone(semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let ctx = Arc::clone(ctx);

        tokio::spawn(async move {
            let _permit = permit;
            Self::execute_delivery(ctx, delivery).await;
        });
    }

    /// Run one delivered message under the hard wall clock and ack it.
    ///
    /// Failed jobs are acked too: the job row already carries the
    /// failure, and retries are operator-initiated, never automatic.
    async fn execute_delivery(ctx: Arc<WorkerContext>, delivery: Delivery) {
        let record_id = delivery.message.record_id();
        debug!(record = %record_id, "Executing job message");

        let soft_warning = spawn_soft_timeout_warning(
            record_id.clone(),
            ctx.config.job_soft_timeout,
        );

        let hard = ctx.config.job_hard_timeout;
        let result = tokio::time::timeout(hard, Self::process(&ctx, &delivery.message)).await;
        soft_warning.abort();

        match result {
            Ok(Ok(())) => {
                info!(record = %record_id, "Job message processed");
            }
            Ok(Err(e)) => {
                error!(record = %record_id, error = %e, "Job failed");
            }
            Err(_) => {
                error!(record = %record_id, hard_secs = hard.as_secs(), "Job hit the hard wall clock");
                Self::mark_timed_out(&ctx, &delivery.message, hard.as_secs()).await;
            }
        }

        if let Err(e) = ctx.queue.ack(&delivery).await {
            error!(record = %record_id, error = %e, "Failed to ack message");
        }
    }

    async fn process(ctx: &WorkerContext, message: &QueueMessage) -> WorkerResult<()> {
        match message {
            QueueMessage::Analyze(msg) => run_analyze(ctx, msg).await,
            QueueMessage::Render(msg) => run_render(ctx, msg).await,
        }
    }

    /// Record a hard-timeout abort on the driven record.
    async fn mark_timed_out(ctx: &WorkerContext, message: &QueueMessage, hard_secs: u64) {
        let error = WorkerError::Timeout(hard_secs).to_string();
        match message {
            QueueMessage::Analyze(msg) => {
                ctx.db.jobs().mark_failed(msg.job_id, &error).await.ok();
            }
            QueueMessage::Render(msg) => {
                ctx.db.renders().mark_failed(msg.render_id).await.ok();
            }
        }
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.ctx.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
