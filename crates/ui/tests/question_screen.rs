use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use backend::{Backend, BackendError, InMemoryBackend, QuestionSource};
use services::{
    AppServices, EventKind, InMemoryIdentityStore, QueueConfig, RecordingReporter, RecordingSink,
    Telemetry,
};
use split_core::model::{DeviceId, Question, QuestionId, VoteOption};
use split_core::time::fixed_clock;
use ui::views::{DEFAULT_WIDTH, render_question, render_result};
use ui::{NextOutcome, QuestionScreen, QuestionVm, ViewError};

fn question(id: &str, text: &str) -> Question {
    Question::new(QuestionId::new(id).unwrap(), text, "Yes", "No")
}

fn app(backend: Backend) -> AppServices {
    app_with(backend, Telemetry::disabled())
}

fn app_with(backend: Backend, telemetry: Telemetry) -> AppServices {
    AppServices::new(
        backend,
        Arc::new(InMemoryIdentityStore::new()),
        telemetry,
        QueueConfig::default().with_duplicate_refetch_limit(64),
        fixed_clock(),
    )
}

/// Fails until switched on, then serves from the wrapped backend.
struct FlakySource {
    inner: InMemoryBackend,
    online: AtomicBool,
}

#[async_trait]
impl QuestionSource for FlakySource {
    async fn next_question(&self, device: &DeviceId) -> Result<Option<Question>, BackendError> {
        if self.online.load(Ordering::SeqCst) {
            self.inner.next_question(device).await
        } else {
            Err(BackendError::Network("offline".into()))
        }
    }
}

#[tokio::test]
async fn play_a_single_question_to_the_end() {
    let backend = InMemoryBackend::new(vec![question("q1", "Pineapple on pizza?")]);
    let services = app(Backend::in_memory(backend));
    let vm = QuestionVm::open(&services).await.unwrap();

    let QuestionScreen::Ready(card) = vm.screen() else {
        panic!("expected a question");
    };
    assert_eq!(card.number, 1);
    assert_eq!(card.prompt, "Pineapple on pizza?");
    assert!(render_question(&vm.screen()).starts_with("#1  Pineapple on pizza?"));

    let result = vm.vote(VoteOption::B).await.unwrap();
    assert!(result.option_b.selected);
    assert_eq!(result.option_b.percent_str, "100%");
    assert!(render_result(&result, DEFAULT_WIDTH).contains("1 vote"));

    assert_eq!(vm.next().await, NextOutcome::OutOfQuestions);
    assert!(matches!(vm.screen(), QuestionScreen::Ready(_)));
}

#[tokio::test]
async fn next_moves_through_questions_in_order_shown() {
    let backend = InMemoryBackend::new(vec![question("q1", "One?"), question("q2", "Two?")]);
    let services = app(Backend::in_memory(backend));
    let vm = QuestionVm::open(&services).await.unwrap();

    let first = vm.queue().question().unwrap();
    vm.vote(VoteOption::A).await.unwrap();
    assert_eq!(vm.next().await, NextOutcome::Continue);

    let QuestionScreen::Ready(card) = vm.screen() else {
        panic!("expected a question");
    };
    assert_eq!(card.number, 2);
    assert_ne!(card.question_id, first.question_id);
}

#[tokio::test]
async fn failed_first_load_shows_error_until_retried() {
    let store = InMemoryBackend::new(vec![question("q1", "One?")]);
    let flaky = Arc::new(FlakySource {
        inner: store.clone(),
        online: AtomicBool::new(false),
    });
    let mut backend = Backend::in_memory(store);
    backend.questions = flaky.clone();
    let services = app(backend);

    let vm = QuestionVm::open(&services).await.unwrap();
    assert_eq!(
        vm.screen(),
        QuestionScreen::Error("failed to load question".into())
    );
    assert_eq!(vm.vote(VoteOption::A).await.unwrap_err(), ViewError::NothingToVoteOn);

    flaky.online.store(true, Ordering::SeqCst);
    vm.retry().await;
    assert!(matches!(vm.screen(), QuestionScreen::Ready(_)));
}

#[tokio::test]
async fn leaving_is_reported_once() {
    let backend = InMemoryBackend::new(vec![question("q1", "One?")]);
    let services = app(Backend::in_memory(backend));
    let vm = QuestionVm::open(&services).await.unwrap();

    assert!(vm.leave());
    assert!(!vm.leave());
}

#[tokio::test]
async fn skipped_question_comes_back_after_the_rest_are_voted() {
    let backend = InMemoryBackend::new(vec![question("q1", "One?"), question("q2", "Two?")]);
    let services = app(Backend::in_memory(backend));
    let vm = QuestionVm::open(&services).await.unwrap();

    let skipped = vm.queue().question().unwrap().question_id;
    assert!(vm.leave());
    assert_eq!(vm.next().await, NextOutcome::Continue);
    vm.vote(VoteOption::A).await.unwrap();

    assert_eq!(vm.next().await, NextOutcome::Continue);
    assert_eq!(vm.queue().question().unwrap().question_id, skipped);
    vm.vote(VoteOption::B).await.unwrap();

    assert_eq!(vm.next().await, NextOutcome::OutOfQuestions);
    let history = services.history().history(vm.device()).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn moving_on_without_voting_counts_as_leaving() {
    let backend = InMemoryBackend::new(vec![
        question("q1", "One?"),
        question("q2", "Two?"),
        question("q3", "Three?"),
    ]);
    let sink = RecordingSink::new();
    let telemetry = Telemetry::new(Arc::new(sink.clone()), Arc::new(RecordingReporter::new()));
    let services = app_with(Backend::in_memory(backend), telemetry);
    let vm = QuestionVm::open(&services).await.unwrap();

    let unvoted = vm.queue().question().unwrap().question_id;
    assert_eq!(vm.next().await, NextOutcome::Continue);
    let left = sink.events_named(EventKind::QuestionLeft);
    assert_eq!(left.len(), 1);
    assert_eq!(
        left[0].property("question_id").and_then(|v| v.as_str()),
        Some(unvoted.as_str())
    );

    vm.vote(VoteOption::A).await.unwrap();
    assert_eq!(vm.next().await, NextOutcome::Continue);
    assert_eq!(sink.events_named(EventKind::QuestionLeft).len(), 1);
}
