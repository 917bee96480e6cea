//! Job status snapshots in Redis for cheap polling.
//!
//! The database row is the source of truth; these snapshots let the
//! status endpoint poll without touching Postgres on every request and
//! give the workers a heartbeat channel.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use clipforge_models::JobStatus;

use crate::error::QueueResult;

/// Snapshot TTL; terminal snapshots linger a day for late pollers.
pub const SNAPSHOT_TTL_SECS: u64 = 24 * 60 * 60;

/// Heartbeat TTL; a missing heartbeat marks the worker as unresponsive.
pub const HEARTBEAT_TTL_SECS: u64 = 60;

const SNAPSHOT_KEY_PREFIX: &str = "clipforge:status:";
const HEARTBEAT_KEY_PREFIX: &str = "clipforge:heartbeat:";

/// Cached status for one job or render record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Record id (job or render)
    pub record_id: String,
    pub status: JobStatus,
    /// Progress percentage, 0-100
    pub progress: i32,
    /// Milestone step tag
    pub step: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(record_id: impl Into<String>, status: JobStatus, progress: i32) -> Self {
        Self {
            record_id: record_id.into(),
            status,
            progress,
            step: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// Redis-backed snapshot store.
#[derive(Clone)]
pub struct ProgressStore {
    client: redis::Client,
}

impl ProgressStore {
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn from_env() -> QueueResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    /// Write a snapshot.
    pub async fn publish(&self, snapshot: &StatusSnapshot) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{SNAPSHOT_KEY_PREFIX}{}", snapshot.record_id);
        let payload = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(&key, payload, SNAPSHOT_TTL_SECS)
            .await?;
        debug!(record = %snapshot.record_id, progress = snapshot.progress, "Published status snapshot");
        Ok(())
    }

    /// Read a snapshot, if one is cached.
    pub async fn get(&self, record_id: &str) -> QueueResult<Option<StatusSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{SNAPSHOT_KEY_PREFIX}{record_id}");
        let payload: Option<String> = conn.get(&key).await?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p).ok()),
            None => Ok(None),
        }
    }

    /// Refresh the worker heartbeat for a record.
    pub async fn heartbeat(&self, record_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{HEARTBEAT_KEY_PREFIX}{record_id}");
        conn.set_ex::<_, _, ()>(&key, Utc::now().timestamp(), HEARTBEAT_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Whether a worker heartbeat is live for a record.
    pub async fn is_alive(&self, record_id: &str) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{HEARTBEAT_KEY_PREFIX}{record_id}");
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }
}
