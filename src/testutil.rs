//! Shared test helpers for post-media unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{Config, CorsConfig, ServerConfig, StorageConfig};
use crate::object_store::{LocalStore, ObjectStore, ObjectStoreError, Storage, StoredObject};
use crate::storage::Database;
use crate::upload::UploadService;
use crate::AppState;

pub const PUBLIC_URL: &str = "http://localhost:8080/static";

/// Object store whose writes always fail, standing in for a bucket outage.
pub struct FailingStore;

impl FailingStore {
    pub const MESSAGE: &'static str = "simulated bucket write failure";
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn create(
        &self,
        _name: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        Err(ObjectStoreError::Backend(Self::MESSAGE.to_string()))
    }

    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError> {
        Err(ObjectStoreError::NotFound(name.to_string()))
    }
}

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let files_dir = temp_dir.path().join("files");
    let store =
        LocalStore::new(&files_dir, PUBLIC_URL).expect("Failed to create test object store");
    test_state_with_storage(temp_dir, Storage::Ready(Arc::new(store)))
}

/// Create a test AppState around the given storage status.
pub fn test_state_with_storage(temp_dir: &tempfile::TempDir, storage: Storage) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");

    let config = Config {
        cors: CorsConfig::default(),
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: temp_dir.path().join("files").to_string_lossy().to_string(),
            local_public_url: PUBLIC_URL.to_string(),
            ..Default::default()
        },
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");

    Arc::new(AppState {
        config,
        db,
        uploads: UploadService::new(storage),
    })
}
