use std::sync::Arc;

use backend::{Backend, RpcConfig};
use split_core::model::DeviceId;

use crate::Clock;
use crate::device_service::{DeviceService, IdentityStore};
use crate::error::AppServicesError;
use crate::history_service::HistoryService;
use crate::queue::{QueueConfig, QuestionQueue};
use crate::telemetry::Telemetry;
use crate::vote_service::VoteService;

/// Assembles app-facing services over one backend.
#[derive(Clone)]
pub struct AppServices {
    backend: Backend,
    telemetry: Telemetry,
    queue_config: QueueConfig,
    clock: Clock,
    devices: Arc<DeviceService>,
    votes: Arc<VoteService>,
    history: Arc<HistoryService>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        backend: Backend,
        identity_store: Arc<dyn IdentityStore>,
        telemetry: Telemetry,
        queue_config: QueueConfig,
        clock: Clock,
    ) -> Self {
        let devices = Arc::new(DeviceService::new(
            identity_store,
            Arc::clone(&backend.devices),
        ));
        let votes = Arc::new(VoteService::new(Arc::clone(&backend.votes)));
        let history = Arc::new(HistoryService::new(Arc::clone(&backend.votes)));

        Self {
            backend,
            telemetry,
            queue_config,
            clock,
            devices,
            votes,
            history,
        }
    }

    /// Services backed by the hosted backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Backend` if the HTTP client cannot be built.
    pub fn connect(
        config: RpcConfig,
        identity_store: Arc<dyn IdentityStore>,
        telemetry: Telemetry,
        queue_config: QueueConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let backend = Backend::rpc(config)?;
        Ok(Self::new(
            backend,
            identity_store,
            telemetry,
            queue_config,
            clock,
        ))
    }

    /// Resolve and register this installation's identity.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Device` if registration fails.
    pub async fn start(&self) -> Result<DeviceId, AppServicesError> {
        Ok(self.devices.ensure_identity().await?)
    }

    /// A new, empty queue. Call `initialize` with the device identity to fill it.
    #[must_use]
    pub fn question_queue(&self) -> QuestionQueue {
        QuestionQueue::new(
            Arc::clone(&self.backend.questions),
            self.telemetry.clone(),
            self.queue_config.clone(),
            self.clock,
        )
    }

    #[must_use]
    pub fn devices(&self) -> Arc<DeviceService> {
        Arc::clone(&self.devices)
    }

    #[must_use]
    pub fn votes(&self) -> Arc<VoteService> {
        Arc::clone(&self.votes)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}
