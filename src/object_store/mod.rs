mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{StorageBackend, StorageConfig};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object name: {0}")]
    InvalidName(String),
    #[error("Storage configuration error: {0}")]
    Config(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Handle to an object that was just written to a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    /// URL the backend reports for downloading the object.
    pub media_link: String,
}

/// Abstraction over object storage backends.
/// `create` never replaces an existing object; a name clash is an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError>;
    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError>;
}

/// Object storage as seen by the rest of the process after bootstrap.
#[derive(Clone)]
pub enum Storage {
    Ready(Arc<dyn ObjectStore>),
    /// Initialization failed; uploads report `reason` instead of calling a backend.
    Unavailable { reason: String },
}

impl Storage {
    pub fn is_ready(&self) -> bool {
        matches!(self, Storage::Ready(_))
    }
}

/// Build the configured backend.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
    match config.backend {
        StorageBackend::Local => {
            let store = LocalStore::new(&config.local_storage_path, &config.local_public_url)?;
            info!(
                path = %config.local_storage_path,
                "Using local storage backend"
            );
            Ok(Arc::new(store))
        }
        StorageBackend::Gcs => {
            let bucket = config.gcs_bucket.as_deref().ok_or_else(|| {
                ObjectStoreError::Config("GCS_BUCKET is not set".to_string())
            })?;
            let store = GcsStore::new(bucket, config.gcs_credentials_file.as_deref()).await?;
            info!(bucket = %bucket, "Using GCS storage backend");
            Ok(Arc::new(store))
        }
    }
}

/// Like [`connect`], but a failure leaves the process running with storage
/// marked unavailable.
pub async fn connect_or_degrade(config: &StorageConfig) -> Storage {
    match connect(config).await {
        Ok(store) => Storage::Ready(store),
        Err(e) => {
            error!(error = %e, "Failed to initialize object storage; uploads are disabled");
            Storage::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
