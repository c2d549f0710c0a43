use std::sync::Arc;

use async_trait::async_trait;
use split_core::model::{DeviceId, Question, QuestionId, VoteHistoryItem, VoteOption, VoteResult};

use crate::error::BackendError;
use crate::memory::InMemoryBackend;
use crate::rpc::{RpcBackend, RpcConfig};

/// Serves unseen questions for a device.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch a question this device has not answered yet.
    ///
    /// Repeated calls without an intervening vote may return the same question
    /// or a different one; selection is up to the server.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or server failure. `Ok(None)` means
    /// the device has answered everything.
    async fn next_question(&self, device: &DeviceId) -> Result<Option<Question>, BackendError>;
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register a device identity. Safe to call repeatedly for the same id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend rejects or cannot be reached.
    async fn register_device(&self, device: &DeviceId) -> Result<(), BackendError>;
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Record a vote and return the updated tally for the question.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::AlreadyVoted` for a repeated vote, or other
    /// backend errors.
    async fn submit_vote(
        &self,
        device: &DeviceId,
        question_id: &QuestionId,
        option: VoteOption,
    ) -> Result<VoteResult, BackendError>;

    /// Past votes for a device, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or server failure.
    async fn vote_history(&self, device: &DeviceId) -> Result<Vec<VoteHistoryItem>, BackendError>;
}

/// Backend operations behind trait objects so implementations can be swapped.
#[derive(Clone)]
pub struct Backend {
    pub questions: Arc<dyn QuestionSource>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub votes: Arc<dyn VoteRepository>,
}

impl Backend {
    #[must_use]
    pub fn in_memory(backend: InMemoryBackend) -> Self {
        Self {
            questions: Arc::new(backend.clone()),
            devices: Arc::new(backend.clone()),
            votes: Arc::new(backend),
        }
    }

    /// # Errors
    ///
    /// Returns `BackendError::Network` if the HTTP client cannot be built.
    pub fn rpc(config: RpcConfig) -> Result<Self, BackendError> {
        let rpc = RpcBackend::new(config)?;
        Ok(Self {
            questions: Arc::new(rpc.clone()),
            devices: Arc::new(rpc.clone()),
            votes: Arc::new(rpc),
        })
    }
}
