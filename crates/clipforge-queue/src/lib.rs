//! Redis Streams job queue for ClipForge.
//!
//! This crate provides:
//! - Typed job messages (analyze / render)
//! - Priority streams with consumer groups, at-least-once delivery
//! - Reclamation of messages stranded by crashed workers
//! - Status snapshots and heartbeats for cheap polling

pub mod error;
pub mod message;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::{AnalyzeMessage, QueueMessage, RenderMessage};
pub use progress::{ProgressStore, StatusSnapshot, HEARTBEAT_TTL_SECS, SNAPSHOT_TTL_SECS};
pub use queue::{Delivery, JobQueue, Priority, QueueConfig};
