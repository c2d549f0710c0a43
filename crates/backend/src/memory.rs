use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use split_core::Clock;
use split_core::model::{DeviceId, Question, QuestionId, VoteHistoryItem, VoteOption, VoteResult};

use crate::error::BackendError;
use crate::repository::{DeviceRegistry, QuestionSource, VoteRepository};

#[derive(Default)]
struct State {
    questions: Vec<Question>,
    devices: HashSet<DeviceId>,
    tallies: HashMap<QuestionId, (u64, u64)>,
    history: HashMap<DeviceId, Vec<VoteHistoryItem>>,
}

impl State {
    fn require_device(&self, device: &DeviceId) -> Result<(), BackendError> {
        if self.devices.contains(device) {
            Ok(())
        } else {
            Err(BackendError::UnknownDevice)
        }
    }

    fn has_voted(&self, device: &DeviceId, question_id: &QuestionId) -> bool {
        self.history
            .get(device)
            .is_some_and(|items| items.iter().any(|item| &item.question_id == question_id))
    }
}

/// In-process backend for tests, demos and offline development.
///
/// Mirrors the hosted backend's contract: devices must register first,
/// questions are picked at random among those the device has not voted on,
/// and each device may vote once per question.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    clock: Clock,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                questions,
                ..State::default()
            })),
            clock: Clock::default_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    ///
    /// Returns `BackendError::Network` if the state lock is poisoned.
    pub fn add_question(&self, question: Question) -> Result<(), BackendError> {
        self.lock()?.questions.push(question);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BackendError::Network` if the state lock is poisoned.
    pub fn is_registered(&self, device: &DeviceId) -> Result<bool, BackendError> {
        Ok(self.lock()?.devices.contains(device))
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Network(e.to_string()))
    }
}

#[async_trait]
impl QuestionSource for InMemoryBackend {
    async fn next_question(&self, device: &DeviceId) -> Result<Option<Question>, BackendError> {
        let guard = self.lock()?;
        guard.require_device(device)?;

        let unseen: Vec<&Question> = guard
            .questions
            .iter()
            .filter(|q| !guard.has_voted(device, &q.question_id))
            .collect();

        Ok(unseen.choose(&mut rand::rng()).map(|q| (*q).clone()))
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryBackend {
    async fn register_device(&self, device: &DeviceId) -> Result<(), BackendError> {
        let mut guard = self.lock()?;
        if guard.devices.insert(device.clone()) {
            tracing::debug!(device = %device, "registered device");
        }
        Ok(())
    }
}

#[async_trait]
impl VoteRepository for InMemoryBackend {
    async fn submit_vote(
        &self,
        device: &DeviceId,
        question_id: &QuestionId,
        option: VoteOption,
    ) -> Result<VoteResult, BackendError> {
        let mut guard = self.lock()?;
        guard.require_device(device)?;

        let question = guard
            .questions
            .iter()
            .find(|q| &q.question_id == question_id)
            .cloned()
            .ok_or(BackendError::UnknownQuestion)?;
        if guard.has_voted(device, question_id) {
            return Err(BackendError::AlreadyVoted);
        }

        let tally = guard.tallies.entry(question_id.clone()).or_insert((0, 0));
        match option {
            VoteOption::A => tally.0 += 1,
            VoteOption::B => tally.1 += 1,
        }
        let (a, b) = *tally;

        guard
            .history
            .entry(device.clone())
            .or_default()
            .push(VoteHistoryItem {
                question_id: question.question_id,
                question_text: question.question_text,
                option_a: question.option_a,
                option_b: question.option_b,
                selected_option: option,
                voted_at: self.clock.now(),
            });

        Ok(VoteResult::from_counts(question_id.clone(), a, b))
    }

    async fn vote_history(&self, device: &DeviceId) -> Result<Vec<VoteHistoryItem>, BackendError> {
        let guard = self.lock()?;
        guard.require_device(device)?;
        let mut items = guard.history.get(device).cloned().unwrap_or_default();
        items.reverse();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use split_core::time::fixed_clock;

    fn question(id: &str) -> Question {
        Question::new(QuestionId::new(id).unwrap(), format!("{id}?"), "left", "right")
    }

    async fn registered(backend: &InMemoryBackend) -> DeviceId {
        let device = DeviceId::generate();
        backend.register_device(&device).await.unwrap();
        device
    }

    #[tokio::test]
    async fn unregistered_device_is_rejected() {
        let backend = InMemoryBackend::new(vec![question("q1")]);
        let err = backend
            .next_question(&DeviceId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownDevice));
    }

    #[tokio::test]
    async fn voted_questions_are_not_served_again() {
        let backend = InMemoryBackend::new(vec![question("q1"), question("q2")]);
        let device = registered(&backend).await;

        let first = backend.next_question(&device).await.unwrap().unwrap();
        backend
            .submit_vote(&device, first.id(), VoteOption::A)
            .await
            .unwrap();

        let second = backend.next_question(&device).await.unwrap().unwrap();
        assert_ne!(second.id(), first.id());
        backend
            .submit_vote(&device, second.id(), VoteOption::B)
            .await
            .unwrap();

        assert!(backend.next_question(&device).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_vote_is_rejected() {
        let backend = InMemoryBackend::new(vec![question("q1")]);
        let device = registered(&backend).await;
        let id = QuestionId::new("q1").unwrap();

        backend.submit_vote(&device, &id, VoteOption::A).await.unwrap();
        let err = backend
            .submit_vote(&device, &id, VoteOption::B)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::AlreadyVoted));
    }

    #[tokio::test]
    async fn tallies_aggregate_across_devices() {
        let backend = InMemoryBackend::new(vec![question("q1")]);
        let id = QuestionId::new("q1").unwrap();

        for option in [VoteOption::A, VoteOption::A, VoteOption::B, VoteOption::A] {
            let device = registered(&backend).await;
            backend.submit_vote(&device, &id, option).await.unwrap();
        }

        let device = registered(&backend).await;
        let result = backend.submit_vote(&device, &id, VoteOption::B).await.unwrap();
        assert_eq!(result.total_votes, 5);
        assert_eq!(result.option_a_votes, 3);
        assert_eq!(result.option_a_percentage, 60.0);
        assert_eq!(result.option_b_percentage, 40.0);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let backend =
            InMemoryBackend::new(vec![question("q1"), question("q2")]).with_clock(fixed_clock());
        let device = registered(&backend).await;

        for id in ["q1", "q2"] {
            backend
                .submit_vote(&device, &QuestionId::new(id).unwrap(), VoteOption::A)
                .await
                .unwrap();
        }

        let history = backend.vote_history(&device).await.unwrap();
        let ids: Vec<_> = history.iter().map(|h| h.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q1"]);
        assert_eq!(history[0].voted_at, split_core::time::fixed_now());
    }
}
