use std::sync::{Arc, Mutex, PoisonError};

use services::{Advance, AppServices, PrefetchStatus, QuestionQueue, VoteService};
use split_core::model::{DeviceId, QuestionId, VoteOption};

use crate::views::ViewError;
use crate::vm::result_vm::ResultVm;

/// Question on screen, ready to render.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionCardVm {
    pub question_id: QuestionId,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    /// Position in this session, starting at 1.
    pub number: u64,
    /// Fade-in progress in `0.0..=1.0`.
    pub opacity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QuestionScreen {
    Loading,
    Error(String),
    Empty,
    Ready(QuestionCardVm),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextOutcome {
    Continue,
    OutOfQuestions,
    /// The next question could not be fetched; asking again retries.
    TryLater,
}

/// Binds the question queue and vote service to the question screen.
pub struct QuestionVm {
    queue: QuestionQueue,
    votes: Arc<VoteService>,
    device: DeviceId,
    voted: Mutex<Option<QuestionId>>,
}

impl QuestionVm {
    #[must_use]
    pub fn new(queue: QuestionQueue, votes: Arc<VoteService>, device: DeviceId) -> Self {
        Self {
            queue,
            votes,
            device,
            voted: Mutex::new(None),
        }
    }

    /// Resolve the device identity and fill a fresh queue for it.
    ///
    /// A failed first load still yields a view model; the screen then shows
    /// the error and `retry` starts over.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::Unavailable` if the device cannot be registered.
    pub async fn open(services: &AppServices) -> Result<Self, ViewError> {
        let device = services.start().await.map_err(|err| {
            tracing::error!(error = %err, "device registration failed");
            ViewError::Unavailable
        })?;
        let vm = Self::new(services.question_queue(), services.votes(), device);
        vm.load().await;
        Ok(vm)
    }

    pub async fn load(&self) {
        if let Err(err) = self.queue.initialize(self.device.clone()).await {
            tracing::warn!(error = %err, "question load failed");
        }
    }

    pub async fn retry(&self) {
        self.load().await;
    }

    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &QuestionQueue {
        &self.queue
    }

    #[must_use]
    pub fn screen(&self) -> QuestionScreen {
        let snapshot = self.queue.snapshot();
        if snapshot.loading {
            return QuestionScreen::Loading;
        }
        if let Some(message) = snapshot.error {
            return QuestionScreen::Error(message);
        }
        match snapshot.question {
            None => QuestionScreen::Empty,
            Some(question) => QuestionScreen::Ready(QuestionCardVm {
                question_id: question.question_id,
                prompt: question.question_text,
                option_a: question.option_a,
                option_b: question.option_b,
                number: snapshot.question_index + 1,
                opacity: self.queue.transition().progress(),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `ViewError::NothingToVoteOn` when no question is on screen and
    /// `ViewError::VoteFailed` when the backend rejects the vote.
    pub async fn vote(&self, option: VoteOption) -> Result<ResultVm, ViewError> {
        let question = self.queue.question().ok_or(ViewError::NothingToVoteOn)?;
        let outcome = self
            .votes
            .vote(&self.device, &question, option)
            .await
            .map_err(|_| ViewError::VoteFailed)?;
        *self.voted.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(question.question_id.clone());
        Ok(ResultVm::new(&question, &outcome))
    }

    /// Move to the next question, waiting once for the background fetch when
    /// it has not landed yet. Moving on from a question without voting on it
    /// counts as leaving it.
    pub async fn next(&self) -> NextOutcome {
        if !self.voted_on_current() {
            self.queue.report_leave();
        }
        if let Advance::Moved { .. } = self.queue.advance() {
            return NextOutcome::Continue;
        }

        self.queue.wait_for_prefetch().await;
        if let Advance::Moved { .. } = self.queue.advance() {
            return NextOutcome::Continue;
        }

        self.queue.wait_for_prefetch().await;
        match self.queue.advance() {
            Advance::Moved { .. } => NextOutcome::Continue,
            Advance::NotReady if self.queue.prefetch_status() == PrefetchStatus::Exhausted => {
                NextOutcome::OutOfQuestions
            }
            Advance::NotReady => NextOutcome::TryLater,
        }
    }

    fn voted_on_current(&self) -> bool {
        let voted = self.voted.lock().unwrap_or_else(PoisonError::into_inner);
        match (self.queue.question(), voted.as_ref()) {
            (Some(current), Some(id)) => &current.question_id == id,
            _ => false,
        }
    }

    /// The user is leaving without voting.
    pub fn leave(&self) -> bool {
        self.queue.report_leave()
    }
}
