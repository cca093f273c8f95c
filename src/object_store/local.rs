use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{ObjectStore, ObjectStoreError, StoredObject};

/// Local filesystem object store for development and testing.
pub struct LocalStore {
    base_path: PathBuf,
    public_url: Url,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_url: &str) -> Result<Self, ObjectStoreError> {
        let public_url = Url::parse(public_url)
            .map_err(|e| ObjectStoreError::Config(format!("invalid public URL: {e}")))?;
        if public_url.cannot_be_a_base() {
            return Err(ObjectStoreError::Config(format!(
                "public URL cannot be a base: {public_url}"
            )));
        }

        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_url,
        })
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, ObjectStoreError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(ObjectStoreError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }

    fn media_link(&self, name: &str) -> String {
        let mut url = self.public_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url.to_string()
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn create(
        &self,
        name: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let path = self.object_path(name)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(StoredObject {
            name: name.to_string(),
            media_link: self.media_link(name),
        })
    }

    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
