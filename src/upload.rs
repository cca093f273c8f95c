//! Upload passthrough to the configured object store.

use bytes::Bytes;
use thiserror::Error;

use crate::object_store::{ObjectStoreError, Storage};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Object storage is unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(#[from] ObjectStoreError),
}

/// A file received from a client, exactly as it arrived.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

pub struct UploadService {
    storage: Storage,
}

impl UploadService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Write `file` under a fresh object name and return the URL the backend
    /// reports for it. Single attempt; nothing is cleaned up on failure.
    pub async fn upload_file(&self, file: FileUpload) -> Result<String, UploadError> {
        let store = match &self.storage {
            Storage::Ready(store) => store,
            Storage::Unavailable { reason } => return Err(UploadError::Unavailable(reason.clone())),
        };

        let name = object_name(&uuid::Uuid::new_v4(), file.file_name.as_deref());
        let content_type = resolve_content_type(file.content_type, file.file_name.as_deref());
        let byte_size = file.data.len();

        let object = store.create(&name, file.data, &content_type).await?;

        tracing::debug!(
            object = %object.name,
            content_type = %content_type,
            byte_size,
            "Uploaded file"
        );
        Ok(object.media_link)
    }
}

/// `<token>-<file name>`, keeping only the last path segment of the client's name.
fn object_name(token: &uuid::Uuid, file_name: Option<&str>) -> String {
    let base = file_name
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .map(str::trim)
        .unwrap_or("");

    if base.is_empty() {
        token.to_string()
    } else {
        format!("{token}-{base}")
    }
}

/// Declared content type unless it is missing or generic, then a guess from the name.
fn resolve_content_type(declared: Option<String>, file_name: Option<&str>) -> String {
    declared
        .filter(|ct| !ct.is_empty() && ct != FALLBACK_CONTENT_TYPE)
        .or_else(|| {
            file_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
