//! Shared error types for the services crate.

use thiserror::Error;

use backend::BackendError;

/// Errors surfaced by `QuestionQueue::initialize`.
///
/// Failures of background prefetches never appear here; they are absorbed
/// and sent to the error reporter instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueueError {
    #[error("failed to load question")]
    Initialize(#[source] BackendError),
    #[error("queue was re-initialized before loading finished")]
    Superseded,
}

/// Errors emitted by `VoteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoteError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors emitted by `HistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors emitted by identity stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityStoreError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
    #[error("stored identity is corrupt: {0}")]
    Corrupt(String),
}

/// Errors emitted by `DeviceService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    #[error("failed to register device")]
    Registration(#[source] BackendError),
    #[error(transparent)]
    Store(#[from] IdentityStoreError),
}

/// Errors returned by telemetry sinks. Never propagated past `Telemetry`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("telemetry channel closed")]
    Closed,
    #[error("telemetry sink rejected event: {0}")]
    Rejected(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
