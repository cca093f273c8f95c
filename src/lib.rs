//! post-media - Media records and file uploads for posts
//!
//! This crate provides:
//! - Media records attached to posts, stored in an embedded redb database
//! - File upload passthrough to swappable object storage (local filesystem, GCS)
//! - REST API under `/api/media` with a fixed CORS policy

pub mod api;
pub mod config;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod upload;

use config::Config;
use storage::Database;
use upload::UploadService;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub uploads: UploadService,
}
