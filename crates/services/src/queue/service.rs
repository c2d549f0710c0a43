use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backend::{BackendError, QuestionSource};
use split_core::Clock;
use split_core::model::{DeviceId, Question};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::config::QueueConfig;
use super::state::{Fill, Landing, PrefetchStatus, QueueSnapshot, QueueState, Shown};
use crate::error::QueueError;
use crate::telemetry::{EventKind, Telemetry, TelemetryEvent};
use crate::transition::TransitionSignal;

/// Outcome of [`QuestionQueue::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The prefetched question is now current.
    Moved { question_index: u64 },
    /// Nothing was buffered; the current question stays.
    NotReady,
}

/// What the prefetch loop should do after handing a result to the state.
enum Step {
    Continue,
    Refetch,
    Stop,
}

struct Inner {
    source: Arc<dyn QuestionSource>,
    telemetry: Telemetry,
    config: QueueConfig,
    clock: Clock,
    signal: TransitionSignal,
    state: Mutex<QueueState>,
    prefetch_task: Mutex<Option<JoinHandle<()>>>,
}

/// Buffered stream of unanswered questions for one device identity.
///
/// Owned by a single consumer. Clones share the same queue so background
/// prefetch tasks can write their results back.
#[derive(Clone)]
pub struct QuestionQueue {
    inner: Arc<Inner>,
}

impl QuestionQueue {
    #[must_use]
    pub fn new(
        source: Arc<dyn QuestionSource>,
        telemetry: Telemetry,
        config: QueueConfig,
        clock: Clock,
    ) -> Self {
        let state = QueueState::new(config.lookahead);
        let signal = TransitionSignal::new(config.transition_duration);
        Self {
            inner: Arc::new(Inner {
                source,
                telemetry,
                config,
                clock,
                signal,
                state: Mutex::new(state),
                prefetch_task: Mutex::new(None),
            }),
        }
    }

    /// Fill the queue for `device`: one fetch for the current question, then
    /// sequential fetches for the buffer.
    ///
    /// Calling this again (to retry, or after the identity changed) starts
    /// over; results still in flight from the earlier call are discarded.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Initialize` when the first fetch fails, and
    /// `QueueError::Superseded` when another `initialize` started meanwhile.
    pub async fn initialize(&self, device: DeviceId) -> Result<(), QueueError> {
        let epoch = self.state().begin_fill(device.clone());
        self.inner.signal.reset();
        tracing::debug!(device = %device, epoch, "filling question queue");

        let first = match self.inner.source.next_question(&device).await {
            Ok(first) => first,
            Err(err) => {
                self.inner.telemetry.report("initial question fetch", &err);
                let err = QueueError::Initialize(err);
                if !self.state().fail_fill(epoch, err.to_string()) {
                    return Err(QueueError::Superseded);
                }
                return Err(err);
            }
        };

        let (upcoming, prefetch) = self.fill_buffer(epoch, &device, first.as_ref()).await;

        let fill = self.state().complete_fill(epoch, first, upcoming, prefetch);
        match fill {
            Fill::Stale => return Err(QueueError::Superseded),
            Fill::Empty => tracing::info!(device = %device, "no unseen questions"),
            Fill::Displayed(shown) => self.present(&shown),
        }
        Ok(())
    }

    /// Sequential fetches behind the first question. A failure here only
    /// leaves the buffer short.
    async fn fill_buffer(
        &self,
        epoch: u64,
        device: &DeviceId,
        first: Option<&Question>,
    ) -> (Vec<Question>, PrefetchStatus) {
        let mut upcoming: Vec<Question> = Vec::new();
        let mut duplicates = 0;

        while upcoming.len() < self.inner.config.lookahead {
            if !self.is_live(epoch) {
                break;
            }
            match self.inner.source.next_question(device).await {
                Ok(Some(question)) => {
                    let held = first.is_some_and(|f| f.question_id == question.question_id)
                        || upcoming.iter().any(|q| q.question_id == question.question_id);
                    if !held {
                        upcoming.push(question);
                        continue;
                    }
                    duplicates += 1;
                    if duplicates > self.inner.config.duplicate_refetch_limit {
                        return (upcoming, PrefetchStatus::Exhausted);
                    }
                }
                Ok(None) => return (upcoming, PrefetchStatus::Exhausted),
                Err(err) => {
                    tracing::warn!(error = %err, "prefetch during initial load failed");
                    self.inner.telemetry.report("prefetch", &err);
                    return (upcoming, PrefetchStatus::Failed);
                }
            }
        }
        (upcoming, PrefetchStatus::Idle)
    }

    /// Promote the prefetched question and start refilling the buffer.
    ///
    /// Does nothing when no question is buffered; the current question is
    /// never dropped without a replacement. Must be called from within a Tokio
    /// runtime for the refill to run.
    pub fn advance(&self) -> Advance {
        let promoted = {
            let mut state = self.state();
            match state.promote() {
                Some(shown) => Ok(shown),
                None => Err(state.needs_retry().then(|| state.epoch())),
            }
        };

        match promoted {
            Ok(shown) => {
                let question_index = shown.index;
                self.present(&shown);
                self.schedule_prefetch(shown.epoch);
                Advance::Moved { question_index }
            }
            Err(retry_epoch) => {
                if let Some(epoch) = retry_epoch {
                    tracing::debug!(epoch, "retrying failed prefetch");
                    self.schedule_prefetch(epoch);
                }
                Advance::NotReady
            }
        }
    }

    /// Emit `question_left` for the question on screen. Repeated calls for
    /// the same question emit nothing. Returns whether an event was emitted.
    pub fn report_leave(&self) -> bool {
        let Some((question_id, index, device)) = self.state().take_leave() else {
            return false;
        };
        let event = TelemetryEvent::question(
            EventKind::QuestionLeft,
            &question_id,
            index,
            &device,
            self.inner.clock.now(),
        );
        self.inner.telemetry.emit(&event);
        true
    }

    /// Wait for the outstanding background prefetch, if any.
    pub async fn wait_for_prefetch(&self) {
        let task = self
            .inner
            .prefetch_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "prefetch task ended abnormally");
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        self.state().snapshot()
    }

    #[must_use]
    pub fn question(&self) -> Option<Question> {
        self.state().current().cloned()
    }

    #[must_use]
    pub fn next_question(&self) -> Option<Question> {
        self.snapshot().next
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.snapshot().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.snapshot().error
    }

    #[must_use]
    pub fn question_index(&self) -> u64 {
        self.state().question_index()
    }

    #[must_use]
    pub fn prefetch_status(&self) -> PrefetchStatus {
        self.state().prefetch()
    }

    #[must_use]
    pub fn device(&self) -> Option<DeviceId> {
        self.state().device().cloned()
    }

    #[must_use]
    pub fn transition(&self) -> &TransitionSignal {
        &self.inner.signal
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, epoch: u64) -> bool {
        self.state().is_live(epoch)
    }

    /// Report the new current question, then restart the transition. The
    /// event always precedes the signal for the same question.
    fn present(&self, shown: &Shown) {
        tracing::debug!(
            question_id = %shown.question.question_id,
            index = shown.index,
            "question displayed"
        );
        let event = TelemetryEvent::question(
            EventKind::QuestionDisplayed,
            &shown.question.question_id,
            shown.index,
            &shown.device,
            self.inner.clock.now(),
        );
        self.inner.telemetry.emit(&event);
        self.inner.signal.reset();
        self.inner.signal.begin();
    }

    fn schedule_prefetch(&self, epoch: u64) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no async runtime; skipping prefetch");
            return;
        };
        let Some(device) = self.state().begin_prefetch(epoch) else {
            return;
        };

        let queue = self.clone();
        let task = runtime.spawn(async move { queue.run_prefetch(epoch, device).await });
        *self
            .inner
            .prefetch_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    async fn run_prefetch(&self, epoch: u64, device: DeviceId) {
        let mut duplicates = 0;
        loop {
            let fetched = self.fetch_with_retry(epoch, &device).await;
            match self.land(epoch, fetched) {
                Step::Continue => duplicates = 0,
                Step::Refetch => {
                    duplicates += 1;
                    if duplicates > self.inner.config.duplicate_refetch_limit {
                        tracing::debug!("server keeps returning held questions");
                        self.state().exhaust_prefetch(epoch);
                        return;
                    }
                }
                Step::Stop => return,
            }
        }
    }

    fn land(&self, epoch: u64, fetched: Result<Option<Question>, BackendError>) -> Step {
        match fetched {
            Ok(question) => {
                let landing = self.state().land_prefetch(epoch, question);
                match landing {
                    Landing::Stale => {
                        tracing::debug!(epoch, "discarding prefetch for a previous fill");
                        Step::Stop
                    }
                    Landing::Stored { full: true } | Landing::Exhausted => Step::Stop,
                    Landing::Stored { full: false } => Step::Continue,
                    Landing::Duplicate => Step::Refetch,
                }
            }
            Err(err) => {
                if self.state().fail_prefetch(epoch) {
                    tracing::warn!(error = %err, "prefetch failed");
                    self.inner.telemetry.report("prefetch", &err);
                } else {
                    tracing::debug!(epoch, error = %err, "stale prefetch failed");
                }
                Step::Stop
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        epoch: u64,
        device: &DeviceId,
    ) -> Result<Option<Question>, BackendError> {
        let policy = self.inner.config.prefetch_retry;
        let mut attempt = 1;
        loop {
            let err = match self.inner.source.next_question(device).await {
                Ok(question) => return Ok(question),
                Err(err) => err,
            };
            let retry = attempt < policy.max_attempts && err.is_transient() && self.is_live(epoch);
            if !retry {
                return Err(err);
            }
            let delay = policy.delay_after(attempt);
            tracing::debug!(attempt, ?delay, error = %err, "retrying prefetch");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
