use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use services::{IdentityStore, IdentityStoreError};
use split_core::model::DeviceId;

/// Keeps the device identity in a one-line text file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(IdentityStoreError::Unavailable(err.to_string())),
        };
        DeviceId::new(raw)
            .map(Some)
            .map_err(|err| IdentityStoreError::Corrupt(err.to_string()))
    }

    async fn save(&self, device: &DeviceId) -> Result<(), IdentityStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| IdentityStoreError::Unavailable(err.to_string()))?;
        }
        tokio::fs::write(&self.path, format!("{device}\n"))
            .await
            .map_err(|err| IdentityStoreError::Unavailable(err.to_string()))
    }

    async fn clear(&self) -> Result<(), IdentityStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(err) if err.kind() != ErrorKind::NotFound => {
                Err(IdentityStoreError::Unavailable(err.to_string()))
            }
            _ => Ok(()),
        }
    }
}
