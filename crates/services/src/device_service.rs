use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use backend::DeviceRegistry;
use split_core::model::DeviceId;

use crate::error::{DeviceError, IdentityStoreError};

/// Persistent slot for the installation's device identity.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `IdentityStoreError` if the store cannot be read.
    async fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError>;

    /// # Errors
    ///
    /// Returns `IdentityStoreError` if the store cannot be written.
    async fn save(&self, device: &DeviceId) -> Result<(), IdentityStoreError>;

    /// # Errors
    ///
    /// Returns `IdentityStoreError` if the store cannot be written.
    async fn clear(&self) -> Result<(), IdentityStoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    slot: Arc<Mutex<Option<DeviceId>>>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, device: &DeviceId) -> Result<(), IdentityStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(device.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), IdentityStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Resolves and registers the anonymous device identity.
pub struct DeviceService {
    store: Arc<dyn IdentityStore>,
    registry: Arc<dyn DeviceRegistry>,
}

impl DeviceService {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { store, registry }
    }

    /// Load the stored identity, creating one on first launch, and register
    /// it with the backend.
    ///
    /// An unreadable or unwritable store does not block the app: a fresh
    /// identity is used for this process only.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Registration` if the backend rejects the device.
    pub async fn ensure_identity(&self) -> Result<DeviceId, DeviceError> {
        let device = match self.store.load().await {
            Ok(Some(device)) => device,
            Ok(None) => {
                let device = DeviceId::generate();
                if let Err(err) = self.store.save(&device).await {
                    tracing::warn!(error = %err, "identity not persisted; using it for this run only");
                }
                device
            }
            Err(err) => {
                tracing::warn!(error = %err, "identity store unreadable; using an ephemeral identity");
                DeviceId::generate()
            }
        };

        self.register(&device).await?;
        Ok(device)
    }

    /// Forget the stored identity and start over with a new one.
    ///
    /// Queues bound to the old identity must be re-initialized.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Store` if the store cannot be updated, or
    /// `DeviceError::Registration` if the new identity is rejected.
    pub async fn reset_identity(&self) -> Result<DeviceId, DeviceError> {
        self.store.clear().await?;
        let device = DeviceId::generate();
        self.store.save(&device).await?;
        self.register(&device).await?;
        tracing::info!(device = %device, "device identity reset");
        Ok(device)
    }

    async fn register(&self, device: &DeviceId) -> Result<(), DeviceError> {
        self.registry
            .register_device(device)
            .await
            .map_err(DeviceError::Registration)
    }
}
