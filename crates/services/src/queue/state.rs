use std::collections::VecDeque;

use serde::Serialize;
use split_core::model::{DeviceId, Question, QuestionId};

/// Where the background refill of the buffer stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefetchStatus {
    Idle,
    InFlight,
    /// The server has nothing new: it returned no question, or only ones
    /// already on screen or buffered. Lifted when a question is promoted.
    Exhausted,
    /// The last refill failed; the next refused `advance` retries it.
    Failed,
}

/// Read-only view of the queue for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub question: Option<Question>,
    pub next: Option<Question>,
    pub loading: bool,
    pub error: Option<String>,
    pub question_index: u64,
    pub prefetch: PrefetchStatus,
}

/// Result of handing a completed initial fill to the state.
#[derive(Debug, PartialEq)]
pub(super) enum Fill {
    Stale,
    Empty,
    Displayed(Shown),
}

/// Result of handing a prefetched question to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Landing {
    Stale,
    Stored { full: bool },
    Duplicate,
    Exhausted,
}

/// A question that just became current, with its telemetry correlation.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Shown {
    pub question: Question,
    pub index: u64,
    pub epoch: u64,
    pub device: DeviceId,
}

/// Synchronous queue state. All transitions happen under one lock held by
/// `QuestionQueue`; network work happens outside it and is handed back
/// tagged with the epoch it was started in.
#[derive(Debug)]
pub(super) struct QueueState {
    lookahead: usize,
    epoch: u64,
    device: Option<DeviceId>,
    current: Option<Question>,
    upcoming: VecDeque<Question>,
    loading: bool,
    error: Option<String>,
    question_index: u64,
    prefetch: PrefetchStatus,
    left_reported: bool,
}

impl QueueState {
    pub(super) fn new(lookahead: usize) -> Self {
        Self {
            lookahead: lookahead.max(1),
            epoch: 0,
            device: None,
            current: None,
            upcoming: VecDeque::new(),
            loading: false,
            error: None,
            question_index: 0,
            prefetch: PrefetchStatus::Idle,
            left_reported: false,
        }
    }

    pub(super) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(super) fn is_live(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub(super) fn device(&self) -> Option<&DeviceId> {
        self.device.as_ref()
    }

    pub(super) fn current(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub(super) fn question_index(&self) -> u64 {
        self.question_index
    }

    pub(super) fn prefetch(&self) -> PrefetchStatus {
        self.prefetch
    }

    /// Opens a new epoch bound to `device`. Anything still in flight from an
    /// older epoch will be discarded when it lands.
    pub(super) fn begin_fill(&mut self, device: DeviceId) -> u64 {
        self.epoch += 1;
        self.device = Some(device);
        self.current = None;
        self.upcoming.clear();
        self.loading = true;
        self.error = None;
        self.prefetch = PrefetchStatus::Idle;
        self.left_reported = false;
        self.epoch
    }

    pub(super) fn fail_fill(&mut self, epoch: u64, message: String) -> bool {
        if !self.is_live(epoch) {
            return false;
        }
        self.loading = false;
        self.error = Some(message);
        true
    }

    pub(super) fn complete_fill(
        &mut self,
        epoch: u64,
        first: Option<Question>,
        upcoming: Vec<Question>,
        prefetch: PrefetchStatus,
    ) -> Fill {
        if !self.is_live(epoch) {
            return Fill::Stale;
        }
        let Some(device) = self.device.clone() else {
            return Fill::Stale;
        };

        self.loading = false;
        self.question_index = 0;
        self.left_reported = false;
        self.prefetch = prefetch;
        self.upcoming = upcoming.into_iter().take(self.lookahead).collect();
        self.current = first.clone();

        match first {
            Some(question) => Fill::Displayed(Shown {
                question,
                index: 0,
                epoch,
                device,
            }),
            None => Fill::Empty,
        }
    }

    /// Moves the head of the buffer into `current`. `None` leaves everything
    /// untouched.
    pub(super) fn promote(&mut self) -> Option<Shown> {
        if self.loading {
            return None;
        }
        let device = self.device.clone()?;
        let question = self.upcoming.pop_front()?;

        self.current = Some(question.clone());
        self.question_index += 1;
        self.left_reported = false;
        // a freed slot gets a fresh attempt
        if self.prefetch == PrefetchStatus::Exhausted {
            self.prefetch = PrefetchStatus::Idle;
        }

        Some(Shown {
            question,
            index: self.question_index,
            epoch: self.epoch,
            device,
        })
    }

    /// Whether `question` is neither on screen nor buffered. A question shown
    /// earlier and skipped may come back and is shown again.
    pub(super) fn accepts(&self, question: &Question) -> bool {
        let id = &question.question_id;
        self.current.as_ref().is_none_or(|q| &q.question_id != id)
            && self.upcoming.iter().all(|q| &q.question_id != id)
    }

    /// Claims the single prefetch slot. Returns the device to fetch for.
    pub(super) fn begin_prefetch(&mut self, epoch: u64) -> Option<DeviceId> {
        let blocked = !self.is_live(epoch)
            || self.loading
            || self.error.is_some()
            || matches!(
                self.prefetch,
                PrefetchStatus::InFlight | PrefetchStatus::Exhausted
            )
            || self.upcoming.len() >= self.lookahead;
        if blocked {
            return None;
        }
        let device = self.device.clone()?;
        self.prefetch = PrefetchStatus::InFlight;
        Some(device)
    }

    pub(super) fn land_prefetch(&mut self, epoch: u64, fetched: Option<Question>) -> Landing {
        if !self.is_live(epoch) {
            return Landing::Stale;
        }
        match fetched {
            None => {
                self.prefetch = PrefetchStatus::Exhausted;
                Landing::Exhausted
            }
            Some(question) if !self.accepts(&question) => Landing::Duplicate,
            Some(question) => {
                self.upcoming.push_back(question);
                let full = self.upcoming.len() >= self.lookahead;
                if full {
                    self.prefetch = PrefetchStatus::Idle;
                }
                Landing::Stored { full }
            }
        }
    }

    /// Ends the in-flight prefetch after the server kept returning questions
    /// the queue already holds. `false` when `epoch` is stale.
    pub(super) fn exhaust_prefetch(&mut self, epoch: u64) -> bool {
        if !self.is_live(epoch) {
            return false;
        }
        self.prefetch = PrefetchStatus::Exhausted;
        true
    }

    /// Marks the in-flight prefetch as failed. `false` when `epoch` is stale.
    pub(super) fn fail_prefetch(&mut self, epoch: u64) -> bool {
        if !self.is_live(epoch) {
            return false;
        }
        self.prefetch = PrefetchStatus::Failed;
        true
    }

    /// A refused `advance` should kick a new prefetch.
    pub(super) fn needs_retry(&self) -> bool {
        !self.loading
            && self.current.is_some()
            && self.upcoming.is_empty()
            && self.prefetch == PrefetchStatus::Failed
    }

    /// Claims the leave event for the current question, once per question.
    pub(super) fn take_leave(&mut self) -> Option<(QuestionId, u64, DeviceId)> {
        if self.left_reported {
            return None;
        }
        let question = self.current.as_ref()?;
        let device = self.device.clone()?;
        self.left_reported = true;
        Some((question.question_id.clone(), self.question_index, device))
    }

    pub(super) fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            question: self.current.clone(),
            next: self.upcoming.front().cloned(),
            loading: self.loading,
            error: self.error.clone(),
            question_index: self.question_index,
            prefetch: self.prefetch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str) -> Question {
        Question::new(QuestionId::new(id).unwrap(), id, "a", "b")
    }

    fn device() -> DeviceId {
        DeviceId::new("device-1").unwrap()
    }

    fn filled(current: &str, next: Option<&str>) -> (QueueState, u64) {
        let mut state = QueueState::new(1);
        let epoch = state.begin_fill(device());
        let upcoming = next.map(q).into_iter().collect();
        state.complete_fill(epoch, Some(q(current)), upcoming, PrefetchStatus::Idle);
        (state, epoch)
    }

    #[test]
    fn fill_sets_current_next_and_index() {
        let (state, _) = filled("q1", Some("q2"));
        let snap = state.snapshot();
        assert_eq!(snap.question.unwrap().question_id.as_str(), "q1");
        assert_eq!(snap.next.unwrap().question_id.as_str(), "q2");
        assert_eq!(snap.question_index, 0);
        assert!(!snap.loading);
    }

    #[test]
    fn promote_without_next_changes_nothing() {
        let (mut state, _) = filled("q1", None);
        let before = state.snapshot();
        assert!(state.promote().is_none());
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn promote_moves_next_and_bumps_index() {
        let (mut state, _) = filled("q1", Some("q2"));
        let shown = state.promote().unwrap();
        assert_eq!(shown.question.question_id.as_str(), "q2");
        assert_eq!(shown.index, 1);
        assert!(state.snapshot().next.is_none());
    }

    #[test]
    fn stale_epoch_cannot_land() {
        let (mut state, old) = filled("q1", None);
        state.begin_fill(DeviceId::new("device-2").unwrap());
        assert_eq!(state.land_prefetch(old, Some(q("q9"))), Landing::Stale);
        assert!(!state.fail_prefetch(old));
        assert_eq!(
            state.complete_fill(old, Some(q("q9")), Vec::new(), PrefetchStatus::Idle),
            Fill::Stale
        );
    }

    #[test]
    fn only_one_prefetch_at_a_time() {
        let (mut state, epoch) = filled("q1", None);
        assert!(state.begin_prefetch(epoch).is_some());
        assert!(state.begin_prefetch(epoch).is_none());
        assert_eq!(state.prefetch(), PrefetchStatus::InFlight);
    }

    #[test]
    fn full_buffer_does_not_prefetch() {
        let (mut state, epoch) = filled("q1", Some("q2"));
        assert!(state.begin_prefetch(epoch).is_none());
    }

    #[test]
    fn held_questions_are_refused_but_earlier_ones_return() {
        let (mut state, epoch) = filled("q1", Some("q2"));
        state.promote();
        state.begin_prefetch(epoch);
        assert_eq!(state.land_prefetch(epoch, Some(q("q2"))), Landing::Duplicate);
        assert_eq!(
            state.land_prefetch(epoch, Some(q("q1"))),
            Landing::Stored { full: true }
        );
        assert_eq!(state.snapshot().next.unwrap().question_id.as_str(), "q1");
    }

    #[test]
    fn promotion_lifts_exhaustion() {
        let (mut state, epoch) = filled("q1", Some("q2"));
        assert!(state.exhaust_prefetch(epoch));
        state.promote();
        assert_eq!(state.prefetch(), PrefetchStatus::Idle);
        assert!(state.begin_prefetch(epoch).is_some());
    }

    #[test]
    fn exhausted_server_stops_prefetching() {
        let (mut state, epoch) = filled("q1", None);
        state.begin_prefetch(epoch);
        assert_eq!(state.land_prefetch(epoch, None), Landing::Exhausted);
        assert!(state.begin_prefetch(epoch).is_none());
        assert!(!state.needs_retry());
    }

    #[test]
    fn failed_prefetch_requests_retry() {
        let (mut state, epoch) = filled("q1", None);
        state.begin_prefetch(epoch);
        assert!(state.fail_prefetch(epoch));
        assert!(state.needs_retry());
        assert!(state.begin_prefetch(epoch).is_some());
    }

    #[test]
    fn leave_is_reported_once_per_question() {
        let (mut state, _) = filled("q1", Some("q2"));
        assert_eq!(state.take_leave().unwrap().1, 0);
        assert!(state.take_leave().is_none());
        state.promote();
        assert_eq!(state.take_leave().unwrap().1, 1);
        assert_eq!(state.question_index(), 1);
    }

    #[test]
    fn larger_lookahead_keeps_more_buffered() {
        let mut state = QueueState::new(3);
        let epoch = state.begin_fill(device());
        state.complete_fill(epoch, Some(q("q1")), vec![q("q2")], PrefetchStatus::Idle);
        assert!(state.begin_prefetch(epoch).is_some());
        assert_eq!(
            state.land_prefetch(epoch, Some(q("q3"))),
            Landing::Stored { full: false }
        );
        assert_eq!(state.prefetch(), PrefetchStatus::InFlight);
        assert_eq!(
            state.land_prefetch(epoch, Some(q("q4"))),
            Landing::Stored { full: true }
        );
        assert_eq!(state.prefetch(), PrefetchStatus::Idle);
    }
}
