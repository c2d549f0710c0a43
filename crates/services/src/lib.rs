#![forbid(unsafe_code)]

pub mod app_services;
pub mod device_service;
pub mod error;
pub mod history_service;
pub mod queue;
pub mod telemetry;
pub mod transition;
pub mod vote_service;

pub use split_core::Clock;

pub use app_services::AppServices;
pub use device_service::{DeviceService, IdentityStore, InMemoryIdentityStore};
pub use error::{
    AppServicesError, DeviceError, HistoryError, IdentityStoreError, QueueError, TelemetryError,
    VoteError,
};
pub use history_service::HistoryService;
pub use queue::{Advance, PrefetchStatus, QueueConfig, QueueSnapshot, QuestionQueue, RetryPolicy};
pub use telemetry::{
    ChannelSink, ErrorReporter, EventKind, NoopSink, RecordingReporter, RecordingSink, Telemetry,
    TelemetryEvent, TelemetrySink, TracingReporter, TracingSink,
};
pub use transition::TransitionSignal;
pub use vote_service::{VoteOutcome, VoteService};
