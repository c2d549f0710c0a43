use std::sync::Arc;

use backend::{Backend, InMemoryBackend};
use services::{
    Advance, AppServices, InMemoryIdentityStore, PrefetchStatus, QueueConfig, RecordingReporter,
    RecordingSink, Telemetry,
};
use split_core::model::{Question, QuestionId, VoteOption};
use split_core::time::fixed_clock;

fn question(id: &str) -> Question {
    Question::new(
        QuestionId::new(id).unwrap(),
        format!("Would you rather {id}?"),
        "this",
        "that",
    )
}

fn services_with(questions: Vec<Question>) -> (AppServices, RecordingSink) {
    let backend = InMemoryBackend::new(questions).with_clock(fixed_clock());
    let sink = RecordingSink::new();
    let telemetry = Telemetry::new(Arc::new(sink.clone()), Arc::new(RecordingReporter::new()));
    // random picks may repeat the question on screen until it is voted on
    let config = QueueConfig::default().with_duplicate_refetch_limit(64);
    let services = AppServices::new(
        Backend::in_memory(backend),
        Arc::new(InMemoryIdentityStore::new()),
        telemetry,
        config,
        fixed_clock(),
    );
    (services, sink)
}

#[tokio::test]
async fn vote_through_every_question_then_read_history() {
    let (app, sink) = services_with(vec![question("q1"), question("q2"), question("q3")]);
    let device = app.start().await.unwrap();
    let queue = app.question_queue();
    queue.initialize(device.clone()).await.unwrap();

    let mut voted = Vec::new();
    for round in 0..3 {
        let current = queue.question().expect("question on screen");
        let outcome = app
            .votes()
            .vote(&device, &current, VoteOption::A)
            .await
            .unwrap();
        assert_eq!(outcome.result.total_votes, 1);
        assert_eq!(outcome.result.option_a_percentage, 100.0);
        assert_eq!(outcome.streak, round + 1);
        voted.push(current.question_id.clone());

        if queue.advance() == Advance::NotReady {
            queue.wait_for_prefetch().await;
            queue.advance();
        }
        queue.wait_for_prefetch().await;
    }

    let mut unique = voted.clone();
    unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    unique.dedup();
    assert_eq!(unique.len(), 3);

    assert_eq!(queue.advance(), Advance::NotReady);
    queue.wait_for_prefetch().await;
    assert_eq!(queue.prefetch_status(), PrefetchStatus::Exhausted);

    let history = app.history().history(&device).await.unwrap();
    let ids: Vec<_> = history.iter().map(|item| item.question_id.clone()).collect();
    voted.reverse();
    assert_eq!(ids, voted);
    assert_eq!(sink.events().len(), 3);
}

#[tokio::test]
async fn identity_survives_restart_with_the_same_store() {
    let backend = InMemoryBackend::new(vec![question("q1")]);
    let store = Arc::new(InMemoryIdentityStore::new());
    let build = || {
        AppServices::new(
            Backend::in_memory(backend.clone()),
            store.clone(),
            Telemetry::disabled(),
            QueueConfig::default(),
            fixed_clock(),
        )
    };

    let first = build().start().await.unwrap();
    let second = build().start().await.unwrap();
    assert_eq!(first, second);
    assert!(backend.is_registered(&first).unwrap());
}

#[tokio::test]
async fn reset_identity_requires_a_fresh_queue_fill() {
    let (app, _sink) = services_with(vec![question("q1"), question("q2")]);
    let old = app.start().await.unwrap();
    let queue = app.question_queue();
    queue.initialize(old.clone()).await.unwrap();

    let new = app.devices().reset_identity().await.unwrap();
    assert_ne!(old, new);

    queue.initialize(new.clone()).await.unwrap();
    assert_eq!(queue.device(), Some(new));
    assert_eq!(queue.question_index(), 0);
    assert!(queue.question().is_some());
}
