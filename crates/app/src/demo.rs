use backend::{BackendError, InMemoryBackend};
use split_core::model::{Question, QuestionId};

const QUESTIONS: [(&str, &str, &str, &str); 8] = [
    (
        "demo-01",
        "Would you rather be able to fly or be invisible?",
        "Fly",
        "Be invisible",
    ),
    (
        "demo-02",
        "Would you rather live by the sea or in the mountains?",
        "By the sea",
        "In the mountains",
    ),
    (
        "demo-03",
        "Would you rather never use social media again or never watch another movie?",
        "No social media",
        "No movies",
    ),
    (
        "demo-04",
        "Would you rather always be 10 minutes late or 20 minutes early?",
        "10 minutes late",
        "20 minutes early",
    ),
    (
        "demo-05",
        "Would you rather speak every language or play every instrument?",
        "Every language",
        "Every instrument",
    ),
    (
        "demo-06",
        "Would you rather have summer or winter all year?",
        "Summer",
        "Winter",
    ),
    (
        "demo-07",
        "Would you rather read minds or see the future?",
        "Read minds",
        "See the future",
    ),
    (
        "demo-08",
        "Would you rather give up coffee or give up chocolate?",
        "Coffee",
        "Chocolate",
    ),
];

/// In-process backend seeded with a handful of questions.
///
/// # Errors
///
/// Returns `BackendError::Serialization` if a seed id is blank.
pub fn demo_backend() -> Result<InMemoryBackend, BackendError> {
    let questions = QUESTIONS
        .iter()
        .map(|(id, text, a, b)| {
            QuestionId::new(*id)
                .map(|id| Question::new(id, *text, *a, *b))
                .map_err(|err| BackendError::Serialization(err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InMemoryBackend::new(questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_ids_are_unique() {
        let ids: HashSet<_> = QUESTIONS.iter().map(|(id, ..)| *id).collect();
        assert_eq!(ids.len(), QUESTIONS.len());
        assert!(demo_backend().is_ok());
    }
}
