use std::sync::{Arc, Mutex, PoisonError};

use backend::VoteRepository;
use split_core::model::{DeviceId, Question, Streak, VoteOption, VoteResult};

use crate::error::VoteError;

/// Tally returned after voting, with the updated streak.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub result: VoteResult,
    pub selected: VoteOption,
    pub streak: u32,
}

/// Submits votes and keeps the in-process voting streak.
pub struct VoteService {
    votes: Arc<dyn VoteRepository>,
    streak: Mutex<Streak>,
}

impl VoteService {
    #[must_use]
    pub fn new(votes: Arc<dyn VoteRepository>) -> Self {
        Self {
            votes,
            streak: Mutex::new(Streak::new()),
        }
    }

    /// Vote on `question`. The streak counts the tap even if submission
    /// fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns `VoteError::Backend` if the vote cannot be recorded.
    pub async fn vote(
        &self,
        device: &DeviceId,
        question: &Question,
        option: VoteOption,
    ) -> Result<VoteOutcome, VoteError> {
        let streak = self
            .streak
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_vote();

        let result = self
            .votes
            .submit_vote(device, question.id(), option)
            .await
            .inspect_err(|err| tracing::warn!(question_id = %question.id(), error = %err, "vote failed"))?;

        Ok(VoteOutcome {
            result,
            selected: option,
            streak,
        })
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value()
    }

    pub fn reset_streak(&self) {
        self.streak
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}
