//! S3-compatible object store client for ClipForge.
//!
//! This crate provides:
//! - File upload/download by fully qualified key
//! - Presigned GET (downloads) and PUT (upload init) URLs
//! - The canonical key layout for uploads, thumbnails and renders
//! - Bounded internal retry for transient failures

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{render_key, render_prefix, thumbnail_key, upload_key};

use std::time::Duration;

/// Presigned download URLs for rendered outputs expire after 24 hours.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Presigned upload URLs expire after 1 hour.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(60 * 60);
