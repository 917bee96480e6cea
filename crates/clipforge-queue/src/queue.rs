//! Job queue over Redis Streams.
//!
//! One stream per (pipeline kind, priority level), each with a consumer
//! group. Delivery is at-least-once: messages are acked only after the
//! worker finishes, and messages stranded by a crashed worker are
//! reclaimed once their idle time passes the visibility window.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use clipforge_models::JobKind;

use crate::error::{QueueError, QueueResult};
use crate::message::QueueMessage;

/// Message priority. FIFO holds within a level; higher levels are
/// consumed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// All levels in consumption order.
    pub fn all() -> &'static [Priority] {
        &[Priority::High, Priority::Normal, Priority::Low]
    }
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name prefix
    pub stream_prefix: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Idle time before a delivered-but-unacked message is reclaimed
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_prefix: "clipforge:jobs".to_string(),
            consumer_group: "clipforge:workers".to_string(),
            visibility_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_prefix: std::env::var("QUEUE_STREAM_PREFIX")
                .unwrap_or_else(|_| "clipforge:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "clipforge:workers".to_string()),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 60),
            ),
        }
    }
}

/// One delivered message, with enough context to ack it.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream the message came from
    pub stream: String,
    /// Redis message id
    pub message_id: String,
    /// Decoded payload
    pub message: QueueMessage,
}

/// Job queue client.
#[derive(Clone)]
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Stream name for a (kind, priority) pair.
    fn stream_name(&self, kind: JobKind, priority: Priority) -> String {
        format!(
            "{}:{}:{}",
            self.config.stream_prefix,
            kind.as_str(),
            priority.as_str()
        )
    }

    /// All streams a pipeline's workers read, highest priority first.
    fn streams_for(&self, kind: JobKind) -> Vec<String> {
        Priority::all()
            .iter()
            .map(|p| self.stream_name(kind, *p))
            .collect()
    }

    /// Create consumer groups for every stream (idempotent).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for kind in [JobKind::Analyze, JobKind::Render] {
            for stream in self.streams_for(kind) {
                let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                    .arg("CREATE")
                    .arg(&stream)
                    .arg(&self.config.consumer_group)
                    .arg("0")
                    .arg("MKSTREAM")
                    .query_async(&mut conn)
                    .await;

                match result {
                    Ok(()) => info!(stream = %stream, "Created consumer group"),
                    Err(e) if e.to_string().contains("BUSYGROUP") => {
                        debug!(stream = %stream, "Consumer group already exists");
                    }
                    Err(e) => return Err(QueueError::Redis(e)),
                }
            }
        }

        Ok(())
    }

    /// Enqueue a typed message at the given priority.
    pub async fn enqueue(&self, message: &QueueMessage, priority: Priority) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let stream = self.stream_name(message.kind(), priority);
        let payload = serde_json::to_string(message)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            record = %message.record_id(),
            stream = %stream,
            message_id = %message_id,
            "Enqueued job message"
        );
        Ok(message_id)
    }

    /// Dequeue messages for one pipeline kind.
    ///
    /// Reads all the kind's priority streams in one call; results are
    /// ordered highest priority first. Blocks up to `block_ms` when
    /// every stream is empty.
    pub async fn dequeue(
        &self,
        kind: JobKind,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let streams = self.streams_for(kind);

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS");
        for stream in &streams {
            cmd.arg(stream);
        }
        for _ in &streams {
            cmd.arg(">");
        }

        let reply: Option<redis::streams::StreamReadReply> = cmd.query_async(&mut conn).await?;
        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let mut deliveries = Vec::new();
        // Collect per stream, then order by our priority list rather
        // than redis's reply order.
        for stream in &streams {
            for key in reply.keys.iter().filter(|k| &k.key == stream) {
                for entry in &key.ids {
                    match decode_entry(stream, &entry.id, &entry.map) {
                        Some(delivery) => deliveries.push(delivery),
                        None => {
                            warn!(stream = %stream, id = %entry.id, "Dropping malformed message");
                            self.ack_raw(&mut conn, stream, &entry.id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(deliveries)
    }

    /// Reclaim messages a crashed worker left pending past the
    /// visibility timeout.
    pub async fn claim_stranded(
        &self,
        kind: JobKind,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let min_idle_ms = self.config.visibility_timeout.as_millis() as u64;
        let mut deliveries = Vec::new();

        for stream in self.streams_for(kind) {
            let reply: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .arg(consumer_name)
                .arg(min_idle_ms)
                .arg("0-0")
                .arg("COUNT")
                .arg(count)
                .query_async(&mut conn)
                .await?;

            for entry in reply.claimed {
                match decode_entry(&stream, &entry.id, &entry.map) {
                    Some(delivery) => {
                        info!(stream = %stream, id = %delivery.message_id, "Claimed stranded message");
                        deliveries.push(delivery);
                    }
                    None => {
                        self.ack_raw(&mut conn, &stream, &entry.id).await.ok();
                    }
                }
            }
        }

        Ok(deliveries)
    }

    /// Acknowledge a processed message and drop it from the stream.
    pub async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.ack_raw(&mut conn, &delivery.stream, &delivery.message_id)
            .await
    }

    async fn ack_raw(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        stream: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        redis::cmd("XACK")
            .arg(stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(conn)
            .await?;
        redis::cmd("XDEL")
            .arg(stream)
            .arg(message_id)
            .query_async::<()>(conn)
            .await?;
        debug!(stream = %stream, message_id = %message_id, "Acked message");
        Ok(())
    }

    /// Total queued messages for a pipeline kind.
    pub async fn len(&self, kind: JobKind) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut total = 0u64;
        for stream in self.streams_for(kind) {
            let len: u64 = conn.xlen(&stream).await?;
            total += len;
        }
        Ok(total)
    }
}

/// Decode one stream entry's payload field.
fn decode_entry(
    stream: &str,
    id: &str,
    map: &std::collections::HashMap<String, redis::Value>,
) -> Option<Delivery> {
    let payload = match map.get("payload") {
        Some(redis::Value::BulkString(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return None,
    };
    let message: QueueMessage = serde_json::from_str(&payload).ok()?;
    Some(Delivery {
        stream: stream.to_string(),
        message_id: id.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_names_are_scoped_by_kind_and_priority() {
        let queue = JobQueue::new(QueueConfig::default()).unwrap();
        assert_eq!(
            queue.stream_name(JobKind::Analyze, Priority::High),
            "clipforge:jobs:analyze:high"
        );
        assert_eq!(
            queue.stream_name(JobKind::Render, Priority::Normal),
            "clipforge:jobs:render:normal"
        );
    }

    #[test]
    fn priorities_consume_high_first() {
        assert_eq!(
            Priority::all(),
            &[Priority::High, Priority::Normal, Priority::Low]
        );
    }
}
