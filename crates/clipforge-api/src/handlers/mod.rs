//! HTTP request handlers.

pub mod health;
pub mod jobs;
pub mod renders;
pub mod videos;
