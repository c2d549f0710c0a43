//! Best-effort analytics and diagnostics.
//!
//! The queue reports through a [`Telemetry`] dispatcher, which wraps an
//! analytics [`TelemetrySink`] and a diagnostic [`ErrorReporter`]. The
//! dispatcher swallows every sink failure, including panics, so analytics can
//! never change what the user sees.

use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use split_core::model::{DeviceId, QuestionId};
use tokio::sync::mpsc;

use crate::error::TelemetryError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A question became the one on screen.
    QuestionDisplayed,
    /// The user left while a question was on screen, without voting.
    QuestionLeft,
}

impl EventKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventKind::QuestionDisplayed => "question_displayed",
            EventKind::QuestionLeft => "question_left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: Map<String, Value>,
}

impl TelemetryEvent {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Map::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Event correlated to a question shown at `question_index` in this session.
    #[must_use]
    pub fn question(
        kind: EventKind,
        question_id: &QuestionId,
        question_index: u64,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(kind.name())
            .with_property("question_id", question_id.as_str())
            .with_property("question_index", question_index)
            .with_property("device_id", device.as_str())
            .with_property("timestamp", at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

//
// ─── SINKS ─────────────────────────────────────────────────────────────────────
//

/// Destination for analytics events.
///
/// Implementations must return promptly; hand slow delivery to a background
/// task (see [`ChannelSink`]).
pub trait TelemetrySink: Send + Sync {
    /// # Errors
    ///
    /// Returns `TelemetryError` when the event could not be accepted.
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Destination for diagnostics about absorbed failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &(dyn StdError + 'static));
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Writes events to the `telemetry` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let properties = Value::Object(event.properties.clone());
        tracing::info!(
            target: "telemetry",
            event = %event.name,
            properties = %properties,
            "event"
        );
        Ok(())
    }
}

/// Forwards events over an unbounded channel; never blocks the caller.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TelemetrySink for ChannelSink {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.tx
            .send(event.clone())
            .map_err(|_| TelemetryError::Closed)
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events with the given name, in emission order.
    #[must_use]
    pub fn events_named(&self, kind: EventKind) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.name == kind.name())
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &(dyn StdError + 'static)) {
        tracing::error!(context, error = %error, "reported error");
    }
}

/// Keeps `(context, message)` pairs in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &str, error: &(dyn StdError + 'static)) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((context.to_string(), error.to_string()));
    }
}

//
// ─── DISPATCHER ────────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Telemetry {
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { sink, reporter }
    }

    /// Events and errors go to the tracing subscriber.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink), Arc::new(TracingReporter))
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopSink), Arc::new(TracingReporter))
    }

    /// Hands the event to the sink. Failures are logged and dropped.
    pub fn emit(&self, event: &TelemetryEvent) {
        match catch_unwind(AssertUnwindSafe(|| self.sink.emit(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(event = %event.name, error = %err, "telemetry sink failed");
            }
            Err(_) => {
                tracing::warn!(event = %event.name, "telemetry sink panicked");
            }
        }
    }

    pub fn report(&self, context: &str, error: &(dyn StdError + 'static)) {
        if catch_unwind(AssertUnwindSafe(|| self.reporter.report(context, error))).is_err() {
            tracing::warn!(context, "error reporter panicked");
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::tracing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use split_core::time::fixed_now;

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn emit(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError::Rejected("quota".into()))
        }
    }

    struct PanickingSink;

    impl TelemetrySink for PanickingSink {
        fn emit(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            panic!("sdk exploded");
        }
    }

    fn sample() -> TelemetryEvent {
        TelemetryEvent::question(
            EventKind::QuestionDisplayed,
            &QuestionId::new("q1").unwrap(),
            3,
            &DeviceId::new("dev").unwrap(),
            fixed_now(),
        )
    }

    #[test]
    fn question_event_carries_correlation_fields() {
        let event = sample();
        assert_eq!(event.name, "question_displayed");
        assert_eq!(event.property("question_id"), Some(&Value::from("q1")));
        assert_eq!(event.property("question_index"), Some(&Value::from(3)));
        assert_eq!(event.property("device_id"), Some(&Value::from("dev")));
        assert_eq!(
            event.property("timestamp"),
            Some(&Value::from("2023-11-14T22:13:20.000Z"))
        );
    }

    #[test]
    fn failing_and_panicking_sinks_are_swallowed() {
        Telemetry::new(Arc::new(FailingSink), Arc::new(TracingReporter)).emit(&sample());
        Telemetry::new(Arc::new(PanickingSink), Arc::new(TracingReporter)).emit(&sample());
    }

    #[test]
    fn tracing_sink_accepts_events_with_properties() {
        assert!(TracingSink.emit(&sample()).is_ok());
        assert!(TracingSink.emit(&TelemetryEvent::new("bare")).is_ok());
    }

    #[test]
    fn recording_sink_filters_by_kind() {
        let sink = RecordingSink::new();
        let telemetry = Telemetry::new(Arc::new(sink.clone()), Arc::new(TracingReporter));
        telemetry.emit(&sample());
        telemetry.emit(&TelemetryEvent::new(EventKind::QuestionLeft.name()));
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.events_named(EventKind::QuestionLeft).len(), 1);
    }

    #[test]
    fn closed_channel_reports_error() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        assert!(matches!(sink.emit(&sample()), Err(TelemetryError::Closed)));
    }

    #[test]
    fn reporter_records_context() {
        let reporter = RecordingReporter::new();
        let telemetry = Telemetry::new(Arc::new(NoopSink), Arc::new(reporter.clone()));
        telemetry.report("prefetch", &TelemetryError::Closed);
        assert_eq!(
            reporter.reports(),
            vec![("prefetch".to_string(), "telemetry channel closed".to_string())]
        );
    }
}
